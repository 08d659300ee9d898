//! Backtest engine: per-instrument event loop and ledger.
//!
//! For each instrument, events are replayed in chronological order:
//!
//! 1. Validate the snapshot (invalid events are skipped and logged)
//! 2. Resolve the RFQ size and client side (tick rule when absent)
//! 3. Price against the current inventory
//! 4. Book the expected or sampled fill into inventory and cash
//!
//! After the last event the ledger closes into one report row.

pub mod ledger;
pub mod loop_runner;
pub mod record;
pub mod state;

pub use ledger::{EventOutcome, InstrumentLedger, InstrumentRun};
pub use loop_runner::{group_by_instrument, run_batch, run_instrument, run_instrument_detailed};
pub use record::{RfqRecord, TickRule};
pub use state::{BacktestSettings, FillModel, LedgerPhase, DEFAULT_RFQ_SIZE};
