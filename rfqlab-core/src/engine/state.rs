//! Backtest settings and the per-instrument state machine.

use serde::{Deserialize, Serialize};

use crate::pricing::VolatilityProxy;
use crate::rng::RngHierarchy;

/// How a quote's fill probability becomes a simulated fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FillModel {
    /// Credit `p_fill * size` on every event. Deterministic expectation.
    #[default]
    Expected,
    /// Fill the full size when a seeded uniform draw falls below `p_fill`.
    ///
    /// Each instrument draws from its own stream derived from `seed`, so the
    /// report is reproducible for a given seed and independent of the order
    /// instruments are processed in.
    Bernoulli { seed: u64 },
}

impl FillModel {
    pub fn rng_hierarchy(&self) -> Option<RngHierarchy> {
        match *self {
            FillModel::Expected => None,
            FillModel::Bernoulli { seed } => Some(RngHierarchy::new(seed)),
        }
    }
}

/// Default requested size when the event table carries no size column.
pub const DEFAULT_RFQ_SIZE: f64 = 1_000.0;

/// Configuration shared by every instrument in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSettings {
    #[serde(default)]
    pub volatility: VolatilityProxy,
    #[serde(default)]
    pub fill_model: FillModel,
    /// Size used for events whose record has no requested size.
    #[serde(default = "default_rfq_size")]
    pub default_rfq_size: f64,
}

fn default_rfq_size() -> f64 {
    DEFAULT_RFQ_SIZE
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            volatility: VolatilityProxy::default(),
            fill_model: FillModel::default(),
            default_rfq_size: DEFAULT_RFQ_SIZE,
        }
    }
}

/// Lifecycle of one instrument's ledger.
///
/// `AwaitingEvent -> ProcessingEvent -> (Filled | Unfilled) -> AwaitingEvent`,
/// ending in `Closed` once the report row has been emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerPhase {
    AwaitingEvent,
    ProcessingEvent,
    Filled,
    Unfilled,
    Closed,
}

impl LedgerPhase {
    pub fn can_transition_to(self, next: LedgerPhase) -> bool {
        use LedgerPhase::*;
        matches!(
            (self, next),
            (AwaitingEvent, ProcessingEvent)
                | (ProcessingEvent, Filled)
                | (ProcessingEvent, Unfilled)
                // a rejected snapshot returns the ledger to waiting
                | (ProcessingEvent, AwaitingEvent)
                | (Filled, AwaitingEvent)
                | (Unfilled, AwaitingEvent)
                | (AwaitingEvent, Closed)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LedgerPhase::*;

    #[test]
    fn settings_defaults() {
        let s = BacktestSettings::default();
        assert_eq!(s.fill_model, FillModel::Expected);
        assert_eq!(s.volatility, VolatilityProxy::Parkinson);
        assert_eq!(s.default_rfq_size, 1_000.0);
    }

    #[test]
    fn expected_model_has_no_rng() {
        assert!(FillModel::Expected.rng_hierarchy().is_none());
        let h = FillModel::Bernoulli { seed: 9 }.rng_hierarchy().unwrap();
        assert_eq!(h.master_seed(), 9);
    }

    #[test]
    fn valid_transitions() {
        assert!(AwaitingEvent.can_transition_to(ProcessingEvent));
        assert!(ProcessingEvent.can_transition_to(Filled));
        assert!(ProcessingEvent.can_transition_to(Unfilled));
        assert!(Filled.can_transition_to(AwaitingEvent));
        assert!(Unfilled.can_transition_to(AwaitingEvent));
        assert!(AwaitingEvent.can_transition_to(Closed));
    }

    #[test]
    fn invalid_transitions() {
        assert!(!Closed.can_transition_to(AwaitingEvent));
        assert!(!Closed.can_transition_to(ProcessingEvent));
        assert!(!Filled.can_transition_to(Closed));
        assert!(!AwaitingEvent.can_transition_to(Filled));
    }

    #[test]
    fn fill_model_serde_tagged() {
        let m: FillModel = serde_json::from_str(r#"{"type":"bernoulli","seed":42}"#).unwrap();
        assert_eq!(m, FillModel::Bernoulli { seed: 42 });
        let e: FillModel = serde_json::from_str(r#"{"type":"expected"}"#).unwrap();
        assert_eq!(e, FillModel::Expected);
    }
}
