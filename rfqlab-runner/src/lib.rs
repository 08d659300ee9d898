//! RFQLab Runner: batch orchestration around `rfqlab-core`.
//!
//! This crate provides:
//! - Event-table loading from CSV with column resolution and a dataset hash
//! - TOML run configuration and content-addressed run ids
//! - Parallel batch runner over instruments
//! - JSON, CSV and Markdown artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;

pub use config::{ConfigError, ExecutionOptions, RunConfig, RunId};
pub use data_loader::{load_events, load_events_from_reader, LoadError, LoadedEvents};
pub use export::{load_artifacts, save_artifacts};
pub use runner::{
    run_backtest, run_backtest_from_data, run_instruments, BacktestRun, RunError, SCHEMA_VERSION,
};
