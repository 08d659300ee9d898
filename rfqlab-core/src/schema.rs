//! Event-table column contract: the boundary between the data loader and the engine.
//!
//! Defines the column names the backtest needs and which of them must be
//! present for the table to be usable at all. Individual bad cells are a
//! per-event concern (skipped); a missing required column is fatal.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The table is structurally unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataShapeError {
    #[error("event table is missing required column '{0}'")]
    MissingColumn(String),
    #[error("event table has duplicate column '{0}'")]
    DuplicateColumn(String),
}

/// Semantic role of a column in the event table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnRole {
    Instrument,
    Mid,
    ModDuration,
    High,
    Low,
    AvgDailyVolume,
    Timestamp,
    RfqSize,
    ClientSide,
}

/// A single column in the event-table contract.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnSpec {
    pub role: ColumnRole,
    /// Header names accepted for this role, preferred name first.
    pub names: &'static [&'static str],
    pub required: bool,
}

/// The canonical event-table contract.
///
/// Column names follow TRACE-style bond data (`cusip_id`, `pr`, `mod_dur`,
/// `prc_hi`, `prc_lo`, `qvolume`). Row order is chronological within an
/// instrument unless a timestamp column is present.
pub const EVENT_TABLE_SCHEMA: &[ColumnSpec] = &[
    ColumnSpec {
        role: ColumnRole::Instrument,
        names: &["cusip_id", "instrument"],
        required: true,
    },
    ColumnSpec {
        role: ColumnRole::Mid,
        names: &["pr", "mid"],
        required: true,
    },
    ColumnSpec {
        role: ColumnRole::ModDuration,
        names: &["mod_dur", "mod_duration"],
        required: true,
    },
    ColumnSpec {
        role: ColumnRole::High,
        names: &["prc_hi", "high"],
        required: true,
    },
    ColumnSpec {
        role: ColumnRole::Low,
        names: &["prc_lo", "low"],
        required: true,
    },
    ColumnSpec {
        role: ColumnRole::AvgDailyVolume,
        names: &["qvolume", "avg_daily_volume"],
        required: true,
    },
    ColumnSpec {
        role: ColumnRole::Timestamp,
        names: &["timestamp", "trd_exctn_dt"],
        required: false,
    },
    ColumnSpec {
        role: ColumnRole::RfqSize,
        names: &["rfq_size", "size"],
        required: false,
    },
    ColumnSpec {
        role: ColumnRole::ClientSide,
        names: &["client_side", "side"],
        required: false,
    },
];

/// Header positions resolved against [`EVENT_TABLE_SCHEMA`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub instrument: usize,
    pub mid: usize,
    pub mod_duration: usize,
    pub high: usize,
    pub low: usize,
    pub avg_daily_volume: usize,
    pub timestamp: Option<usize>,
    pub rfq_size: Option<usize>,
    pub client_side: Option<usize>,
}

impl ColumnMap {
    /// Resolve column positions from a header row.
    ///
    /// Header names are matched case-insensitively after trimming.
    pub fn resolve<'h>(headers: impl IntoIterator<Item = &'h str>) -> Result<Self, DataShapeError> {
        let headers: Vec<String> = headers
            .into_iter()
            .map(|h| h.trim().to_ascii_lowercase())
            .collect();

        let find = |spec: &ColumnSpec| -> Result<Option<usize>, DataShapeError> {
            let mut hits = headers
                .iter()
                .enumerate()
                .filter(|(_, h)| spec.names.contains(&h.as_str()));
            let first = hits.next().map(|(i, _)| i);
            if let Some((_, dup)) = hits.next() {
                return Err(DataShapeError::DuplicateColumn(dup.clone()));
            }
            match first {
                None if spec.required => {
                    Err(DataShapeError::MissingColumn(spec.names[0].to_string()))
                }
                found => Ok(found),
            }
        };

        let mut map = ColumnMap {
            instrument: 0,
            mid: 0,
            mod_duration: 0,
            high: 0,
            low: 0,
            avg_daily_volume: 0,
            timestamp: None,
            rfq_size: None,
            client_side: None,
        };
        for spec in EVENT_TABLE_SCHEMA {
            let pos = find(spec)?;
            match spec.role {
                ColumnRole::Instrument => map.instrument = pos.unwrap_or_default(),
                ColumnRole::Mid => map.mid = pos.unwrap_or_default(),
                ColumnRole::ModDuration => map.mod_duration = pos.unwrap_or_default(),
                ColumnRole::High => map.high = pos.unwrap_or_default(),
                ColumnRole::Low => map.low = pos.unwrap_or_default(),
                ColumnRole::AvgDailyVolume => map.avg_daily_volume = pos.unwrap_or_default(),
                ColumnRole::Timestamp => map.timestamp = pos,
                ColumnRole::RfqSize => map.rfq_size = pos,
                ColumnRole::ClientSide => map.client_side = pos,
            }
        }
        Ok(map)
    }
}
