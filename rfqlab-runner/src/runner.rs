//! Batch runner: wires together loading, the per-instrument engine, and aggregation.
//!
//! Two entry points:
//! - `run_backtest()`: loads the event table from disk, then runs. Used by the CLI.
//! - `run_backtest_from_data()`: takes pre-loaded events. No I/O.
//!
//! Instruments are independent, so they run on the rayon pool. Each
//! instrument's events are still replayed strictly in order, and results are
//! collected in instrument key order, so the parallel and sequential paths
//! produce identical reports.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use rfqlab_core::engine::{run_instrument_detailed, EventOutcome, InstrumentRun};
use rfqlab_core::{aggregate, BacktestSettings, ModelParameters, ReportSummary, RfqRecord};

use crate::config::{ConfigError, RunConfig, RunId};
use crate::data_loader::{load_events, LoadError, LoadedEvents};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a batch backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestRun {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub dataset_hash: String,
    pub created_at: DateTime<Utc>,
    pub config: RunConfig,
    pub summary: ReportSummary,
    /// Rows read from the event table, including dropped ones.
    pub row_count: usize,
    pub dropped_rows: usize,
    /// Load warnings followed by per-instrument skip warnings.
    pub warnings: Vec<String>,
    /// Per-event fill tape, only kept when `execution.record_events` is set.
    #[serde(default)]
    pub events: Vec<EventOutcome>,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestRun {
    pub fn skipped_events(&self) -> usize {
        self.summary.rows.iter().map(|r| r.skipped_events).sum()
    }
}

/// Load the event table at `data` and run the batch.
pub fn run_backtest(config: &RunConfig, data: &Path) -> Result<BacktestRun, RunError> {
    let loaded = load_events(data)?;
    run_backtest_from_data(config, &loaded)
}

/// Run the batch over pre-loaded events: no I/O.
pub fn run_backtest_from_data(
    config: &RunConfig,
    loaded: &LoadedEvents,
) -> Result<BacktestRun, RunError> {
    config.validate()?;
    let run_id = config.run_id(&loaded.dataset_hash)?;

    let runs = run_instruments(
        &loaded.by_instrument,
        &config.params,
        &config.backtest,
        config.execution.parallel,
        config.execution.threads,
    )?;

    let mut warnings = loaded.warnings.clone();
    let mut rows = Vec::with_capacity(runs.len());
    let mut events = Vec::new();
    for run in runs {
        warnings.extend(run.warnings);
        if config.execution.record_events {
            events.extend(run.events);
        }
        rows.push(run.row);
    }
    let summary = aggregate(&rows);

    info!(
        run_id = %&run_id[..12],
        instruments = summary.instrument_count,
        total_pnl = summary.total_pnl_sum,
        "backtest run complete"
    );

    Ok(BacktestRun {
        schema_version: SCHEMA_VERSION,
        run_id,
        dataset_hash: loaded.dataset_hash.clone(),
        created_at: Utc::now(),
        config: config.clone(),
        summary,
        row_count: loaded.row_count,
        dropped_rows: loaded.dropped_rows,
        warnings,
        events,
    })
}

/// Run every instrument, in parallel or sequentially, returning results in key order.
///
/// `threads` builds a dedicated pool of that size; otherwise the global rayon
/// pool is used. Ignored when `parallel` is false.
pub fn run_instruments(
    by_instrument: &BTreeMap<String, Vec<RfqRecord>>,
    params: &ModelParameters,
    settings: &BacktestSettings,
    parallel: bool,
    threads: Option<usize>,
) -> Result<Vec<InstrumentRun>, RunError> {
    let work: Vec<(&String, &Vec<RfqRecord>)> = by_instrument.iter().collect();
    let run_one = |(instrument, events): &(&String, &Vec<RfqRecord>)| {
        run_instrument_detailed(instrument, events, params, settings)
    };

    if !parallel {
        return Ok(work.iter().map(run_one).collect());
    }

    let runs: Vec<InstrumentRun> = match threads {
        Some(n) => {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(n).build()?;
            pool.install(|| work.par_iter().map(run_one).collect::<Vec<_>>())
        }
        None => work.par_iter().map(run_one).collect(),
    };
    Ok(runs)
}
