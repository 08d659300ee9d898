//! Per-instrument ledger: inventory, cash and running metric accumulators.
//!
//! One ledger exists per instrument for the duration of its event loop. It is
//! never shared, so instruments can be processed on independent threads.

use chrono::NaiveDateTime;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{
    ClientSide, InventoryState, MarketSnapshot, ModelParameters, QuoteResult, RfqEvent,
    SnapshotError,
};
use crate::pricing::quote_with_proxy;
use crate::report::BacktestReportRow;

use super::state::{BacktestSettings, FillModel, LedgerPhase};

const BPS: f64 = 10_000.0;

/// What happened on one priced event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventOutcome {
    pub instrument: String,
    /// Position of the event in the instrument's chronological sequence.
    pub sequence: usize,
    pub timestamp: Option<NaiveDateTime>,
    pub client_side: ClientSide,
    pub mid: f64,
    pub quote: QuoteResult,
    /// Unsigned size credited to inventory (fractional under expected fills).
    pub filled_size: f64,
    pub filled: bool,
    pub slippage_bps: f64,
    pub inventory_after: f64,
    pub cash_after: f64,
}

/// Result of closing a ledger: the report row plus the event tape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentRun {
    pub row: BacktestReportRow,
    pub events: Vec<EventOutcome>,
    pub warnings: Vec<String>,
}

/// Inventory and cash for one instrument, threaded through its event loop.
pub struct InstrumentLedger<'a> {
    instrument: String,
    params: &'a ModelParameters,
    settings: &'a BacktestSettings,
    rng: Option<StdRng>,
    phase: LedgerPhase,
    inventory: InventoryState,
    cash: f64,
    last_mid: Option<f64>,
    sequence: usize,
    skipped: usize,
    filled_volume: f64,
    hit_sum: f64,
    weighted_slippage: f64,
    size_total: f64,
    adv_sum: f64,
    events: Vec<EventOutcome>,
    warnings: Vec<String>,
}

impl<'a> InstrumentLedger<'a> {
    pub fn new(
        instrument: impl Into<String>,
        params: &'a ModelParameters,
        settings: &'a BacktestSettings,
    ) -> Self {
        let instrument = instrument.into();
        let rng = settings
            .fill_model
            .rng_hierarchy()
            .map(|h| h.rng_for(&instrument));
        Self {
            instrument,
            params,
            settings,
            rng,
            phase: LedgerPhase::AwaitingEvent,
            inventory: InventoryState::flat(),
            cash: 0.0,
            last_mid: None,
            sequence: 0,
            skipped: 0,
            filled_volume: 0.0,
            hit_sum: 0.0,
            weighted_slippage: 0.0,
            size_total: 0.0,
            adv_sum: 0.0,
            events: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn phase(&self) -> LedgerPhase {
        self.phase
    }

    pub fn inventory(&self) -> InventoryState {
        self.inventory
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// Number of events priced so far (skipped events excluded).
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn skipped_events(&self) -> usize {
        self.skipped
    }

    fn transition(&mut self, next: LedgerPhase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "illegal ledger transition {:?} -> {:?} for {}",
            self.phase,
            next,
            self.instrument
        );
        self.phase = next;
    }

    /// Price one event against the current inventory and book the fill.
    ///
    /// An invalid snapshot or size leaves the ledger untouched apart from the
    /// skip counter and returns the validation error.
    pub fn process(
        &mut self,
        snapshot: &MarketSnapshot,
        size: f64,
        client_side: ClientSide,
    ) -> Result<&EventOutcome, SnapshotError> {
        self.transition(LedgerPhase::ProcessingEvent);
        let sequence = self.sequence;
        self.sequence += 1;

        let event = RfqEvent::new(self.instrument.clone(), size, client_side);
        let quote = match quote_with_proxy(
            self.params,
            self.settings.volatility,
            snapshot,
            self.inventory,
            &event,
        ) {
            Ok(q) => q,
            Err(e) => {
                self.record_skip(sequence, &e);
                self.transition(LedgerPhase::AwaitingEvent);
                return Err(e);
            }
        };

        let p_fill = quote.fill_probability;
        let (filled_size, hit) = match (self.settings.fill_model, self.rng.as_mut()) {
            (FillModel::Bernoulli { .. }, Some(rng)) => {
                let u: f64 = rng.gen();
                if u < p_fill {
                    (size, 1.0)
                } else {
                    (0.0, 0.0)
                }
            }
            _ => (p_fill * size, p_fill),
        };

        let side = quote.dealer_side;
        let mid = snapshot.mid;
        self.inventory.apply_fill(side, filled_size);
        self.cash -= side.inventory_sign() * filled_size * quote.quoted_price;

        let slippage_bps = quote.edge_per_unit(mid) / mid * BPS;
        self.filled_volume += filled_size.abs();
        self.hit_sum += hit;
        self.weighted_slippage += size * slippage_bps;
        self.size_total += size;
        self.adv_sum += snapshot.avg_daily_volume;
        self.last_mid = Some(mid);

        let filled = filled_size > 0.0;
        self.transition(if filled {
            LedgerPhase::Filled
        } else {
            LedgerPhase::Unfilled
        });

        self.events.push(EventOutcome {
            instrument: self.instrument.clone(),
            sequence,
            timestamp: snapshot.timestamp,
            client_side,
            mid,
            quote,
            filled_size,
            filled,
            slippage_bps,
            inventory_after: self.inventory.position,
            cash_after: self.cash,
        });
        self.transition(LedgerPhase::AwaitingEvent);

        let last = self.events.len() - 1;
        Ok(&self.events[last])
    }

    /// Count an event that never reached the pricing engine.
    pub fn skip(&mut self, reason: &SnapshotError) {
        let sequence = self.sequence;
        self.sequence += 1;
        self.record_skip(sequence, reason);
    }

    fn record_skip(&mut self, sequence: usize, reason: &SnapshotError) {
        warn!(
            instrument = %self.instrument,
            sequence,
            %reason,
            "skipping event"
        );
        self.skipped += 1;
        self.warnings
            .push(format!("{} event {sequence}: {reason}", self.instrument));
    }

    /// Close the ledger and emit the report row. Consumes the ledger.
    pub fn close(mut self) -> InstrumentRun {
        self.transition(LedgerPhase::Closed);

        let event_count = self.events.len();
        let row = if event_count == 0 {
            BacktestReportRow {
                skipped_events: self.skipped,
                ..BacktestReportRow::empty(self.instrument.clone())
            }
        } else {
            let n = event_count as f64;
            let mean_adv = self.adv_sum / n;
            let mark_to_market = self.inventory.position * self.last_mid.unwrap_or(0.0);
            let avg_slippage_bps = if self.size_total > 0.0 {
                self.weighted_slippage / self.size_total
            } else {
                0.0
            };
            BacktestReportRow {
                instrument: self.instrument.clone(),
                total_pnl: self.cash + mark_to_market,
                turnover_ratio: self.filled_volume / mean_adv.max(1.0),
                capture_rate: self.hit_sum / n,
                avg_slippage_bps,
                event_count,
                skipped_events: self.skipped,
                final_inventory: self.inventory.position,
                realized_cash: self.cash,
                mark_to_market,
            }
        };

        debug!(
            instrument = %row.instrument,
            events = row.event_count,
            skipped = row.skipped_events,
            total_pnl = row.total_pnl,
            "instrument closed"
        );

        InstrumentRun {
            row,
            events: self.events,
            warnings: self.warnings,
        }
    }
}
