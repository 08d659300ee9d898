//! MarketSnapshot: one instrument's market state at one moment.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A snapshot failed validation. The offending event is skipped by the backtest.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SnapshotError {
    #[error("{field} is not a finite number (got {value})")]
    NotFinite { field: &'static str, value: f64 },
    #[error("mid price must be positive (got {0})")]
    NonPositiveMid(f64),
    #[error("modified duration must be non-negative (got {0})")]
    NegativeDuration(f64),
    #[error("average daily volume must be non-negative (got {0})")]
    NegativeVolume(f64),
    #[error("inconsistent range: expected high >= mid >= low >= 0 (high={high}, mid={mid}, low={low})")]
    InconsistentRange { high: f64, mid: f64, low: f64 },
    #[error("requested size must be finite and non-negative (got {0})")]
    InvalidSize(f64),
}

/// Market state for a single instrument at a single event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub instrument: String,
    pub mid: f64,
    pub mod_duration: f64,
    pub high: f64,
    pub low: f64,
    pub avg_daily_volume: f64,
    #[serde(default)]
    pub timestamp: Option<NaiveDateTime>,
}

impl MarketSnapshot {
    pub fn new(
        instrument: impl Into<String>,
        mid: f64,
        mod_duration: f64,
        high: f64,
        low: f64,
        avg_daily_volume: f64,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            mid,
            mod_duration,
            high,
            low,
            avg_daily_volume,
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Check every numeric invariant. Returns the first violation found.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        for (field, value) in [
            ("mid", self.mid),
            ("mod_duration", self.mod_duration),
            ("high", self.high),
            ("low", self.low),
            ("avg_daily_volume", self.avg_daily_volume),
        ] {
            if !value.is_finite() {
                return Err(SnapshotError::NotFinite { field, value });
            }
        }
        if self.mid <= 0.0 {
            return Err(SnapshotError::NonPositiveMid(self.mid));
        }
        if self.mod_duration < 0.0 {
            return Err(SnapshotError::NegativeDuration(self.mod_duration));
        }
        if self.avg_daily_volume < 0.0 {
            return Err(SnapshotError::NegativeVolume(self.avg_daily_volume));
        }
        if !(self.high >= self.mid && self.mid >= self.low && self.low >= 0.0) {
            return Err(SnapshotError::InconsistentRange {
                high: self.high,
                mid: self.mid,
                low: self.low,
            });
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}
