//! RFQLab Core: RFQ pricing under inventory risk, and its backtest.
//!
//! This crate contains the computational core:
//! - Domain types (model parameters, market snapshots, RFQs, inventory, quotes)
//! - Pricing engine: inventory skew, optimal half-spread, logistic fill probability
//! - Backtest engine: per-instrument ledger state machine and event loop
//! - Report aggregation
//! - Event-table column contract
//! - Deterministic RNG hierarchy for sampled fills
//!
//! Nothing here performs I/O.

pub mod domain;
pub mod engine;
pub mod pricing;
pub mod report;
pub mod rng;
pub mod schema;

pub use domain::{
    ClientSide, DealerSide, InventoryState, MarketSnapshot, ModelParameters, ParamError,
    QuoteResult, RfqEvent, SnapshotError,
};
pub use engine::{
    group_by_instrument, run_batch, run_instrument, BacktestSettings, FillModel, RfqRecord,
};
pub use pricing::{quote, RfqPricer, VolatilityProxy};
pub use report::{aggregate, BacktestReportRow, ReportSummary};
pub use schema::DataShapeError;
