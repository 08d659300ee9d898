//! Event-table rows and side inference.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::{ClientSide, MarketSnapshot};

/// One row of the historical event table.
///
/// Numeric market fields hold `NaN` when the source cell was empty or
/// unparsable; such rows are rejected by snapshot validation and skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfqRecord {
    pub instrument: String,
    pub mid: f64,
    pub mod_duration: f64,
    pub high: f64,
    pub low: f64,
    pub avg_daily_volume: f64,
    #[serde(default)]
    pub timestamp: Option<NaiveDateTime>,
    /// Requested size, when the table carries one.
    #[serde(default)]
    pub size: Option<f64>,
    #[serde(default)]
    pub client_side: Option<ClientSide>,
}

impl RfqRecord {
    pub fn snapshot(&self) -> MarketSnapshot {
        MarketSnapshot {
            instrument: self.instrument.clone(),
            mid: self.mid,
            mod_duration: self.mod_duration,
            high: self.high,
            low: self.low,
            avg_daily_volume: self.avg_daily_volume,
            timestamp: self.timestamp,
        }
    }

    pub fn from_snapshot(snapshot: MarketSnapshot) -> Self {
        Self {
            instrument: snapshot.instrument,
            mid: snapshot.mid,
            mod_duration: snapshot.mod_duration,
            high: snapshot.high,
            low: snapshot.low,
            avg_daily_volume: snapshot.avg_daily_volume,
            timestamp: snapshot.timestamp,
            size: None,
            client_side: None,
        }
    }

    pub fn with_rfq(mut self, size: f64, client_side: ClientSide) -> Self {
        self.size = Some(size);
        self.client_side = Some(client_side);
        self
    }
}

/// Tick-rule trade-sign inference for records without a client side.
///
/// An uptick in mid versus the previous priced event signs the RFQ as a
/// client buy, a downtick as a client sell, and an unchanged mid repeats the
/// previous sign. The first event of an instrument defaults to a client buy.
#[derive(Debug, Clone)]
pub struct TickRule {
    last_mid: Option<f64>,
    last_side: ClientSide,
}

impl Default for TickRule {
    fn default() -> Self {
        Self {
            last_mid: None,
            last_side: ClientSide::Buy,
        }
    }
}

impl TickRule {
    /// Resolve the side for an event at `mid`. An explicit side wins but
    /// still advances the rule's memory.
    pub fn resolve(&mut self, mid: f64, explicit: Option<ClientSide>) -> ClientSide {
        let side = match (explicit, self.last_mid) {
            (Some(side), _) => side,
            (None, Some(prev)) if mid > prev => ClientSide::Buy,
            (None, Some(prev)) if mid < prev => ClientSide::Sell,
            (None, _) => self.last_side,
        };
        self.last_mid = Some(mid);
        self.last_side = side;
        side
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_rule_signs_by_direction() {
        let mut rule = TickRule::default();
        assert_eq!(rule.resolve(100.0, None), ClientSide::Buy);
        assert_eq!(rule.resolve(99.5, None), ClientSide::Sell);
        assert_eq!(rule.resolve(99.5, None), ClientSide::Sell);
        assert_eq!(rule.resolve(99.7, None), ClientSide::Buy);
    }

    #[test]
    fn explicit_side_overrides_tick_rule() {
        let mut rule = TickRule::default();
        rule.resolve(100.0, None);
        assert_eq!(rule.resolve(101.0, Some(ClientSide::Sell)), ClientSide::Sell);
        // zero tick repeats the explicit side
        assert_eq!(rule.resolve(101.0, None), ClientSide::Sell);
    }

    #[test]
    fn snapshot_round_trip_keeps_market_fields() {
        let snap = MarketSnapshot::new("AAA", 100.0, 3.0, 101.0, 99.0, 500.0);
        let rec = RfqRecord::from_snapshot(snap.clone()).with_rfq(10.0, ClientSide::Sell);
        assert_eq!(rec.snapshot(), snap);
        assert_eq!(rec.size, Some(10.0));
    }
}
