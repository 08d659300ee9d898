//! Event-table loading for the runner.
//!
//! Reads a CSV event table, resolves its columns against the core schema,
//! and groups the rows by instrument. The loader is lenient with cell
//! contents and strict with shape:
//! - a missing required column fails the whole load (`DataShapeError`)
//! - an empty or unparsable numeric cell becomes NaN, and the backtest skips
//!   that event as an invalid snapshot
//! - a short row is padded with empty cells, so its event is skipped
//! - an unparsable timestamp or client side is dropped with a warning; the
//!   row keeps its table position within the instrument
//! - a row with an empty instrument key is dropped with a warning

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use rfqlab_core::schema::ColumnMap;
use rfqlab_core::{group_by_instrument, ClientSide, DataShapeError, RfqRecord};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open event table '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed event table: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Shape(#[from] DataShapeError),
}

/// An event table grouped by instrument, with provenance.
#[derive(Debug, Clone)]
pub struct LoadedEvents {
    /// Records per instrument, in key order, each stable-sorted by timestamp.
    pub by_instrument: BTreeMap<String, Vec<RfqRecord>>,
    /// Data rows read from the table, including dropped ones.
    pub row_count: usize,
    /// Rows dropped before reaching the backtest.
    pub dropped_rows: usize,
    /// Dataset hash for fingerprinting (BLAKE3 over the grouped records).
    pub dataset_hash: String,
    /// Cell-level problems found while reading.
    pub warnings: Vec<String>,
}

impl LoadedEvents {
    pub fn instrument_count(&self) -> usize {
        self.by_instrument.len()
    }

    pub fn event_count(&self) -> usize {
        self.by_instrument.values().map(Vec::len).sum()
    }
}

/// Load an event table from a CSV file.
pub fn load_events(path: &Path) -> Result<LoadedEvents, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let loaded = load_events_from_reader(file)?;
    debug!(
        path = %path.display(),
        rows = loaded.row_count,
        instruments = loaded.instrument_count(),
        "event table loaded"
    );
    Ok(loaded)
}

/// Load an event table from any CSV source with a header row.
pub fn load_events_from_reader<R: Read>(reader: R) -> Result<LoadedEvents, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let columns = ColumnMap::resolve(rdr.headers()?.iter())?;

    let mut records = Vec::new();
    let mut warnings = Vec::new();
    let mut row_count = 0usize;
    let mut dropped_rows = 0usize;

    for (i, row) in rdr.records().enumerate() {
        let row = row?;
        row_count += 1;
        // header is line 1
        let line = i + 2;
        match parse_row(&row, &columns, line, &mut warnings) {
            Some(record) => records.push(record),
            None => dropped_rows += 1,
        }
    }

    for w in &warnings {
        warn!("{w}");
    }

    let by_instrument = group_by_instrument(records);
    let dataset_hash = compute_dataset_hash(&by_instrument);

    Ok(LoadedEvents {
        by_instrument,
        row_count,
        dropped_rows,
        dataset_hash,
        warnings,
    })
}

fn parse_row(
    row: &csv::StringRecord,
    columns: &ColumnMap,
    line: usize,
    warnings: &mut Vec<String>,
) -> Option<RfqRecord> {
    let cell = |idx: usize| row.get(idx).unwrap_or("");

    let instrument = cell(columns.instrument);
    if instrument.is_empty() {
        warnings.push(format!("line {line}: empty instrument key, row dropped"));
        return None;
    }

    let timestamp = columns.timestamp.and_then(|idx| {
        let raw = cell(idx);
        if raw.is_empty() {
            return None;
        }
        let parsed = parse_timestamp(raw);
        if parsed.is_none() {
            warnings.push(format!(
                "line {line}: unparsable timestamp '{raw}', row kept in table order"
            ));
        }
        parsed
    });

    let size = columns.rfq_size.and_then(|idx| {
        let raw = cell(idx);
        (!raw.is_empty()).then(|| parse_number(raw))
    });

    let client_side = columns.client_side.and_then(|idx| {
        let raw = cell(idx);
        if raw.is_empty() {
            return None;
        }
        match raw.parse::<ClientSide>() {
            Ok(side) => Some(side),
            Err(e) => {
                warnings.push(format!("line {line}: {e}, side inferred by tick rule"));
                None
            }
        }
    });

    Some(RfqRecord {
        instrument: instrument.to_string(),
        mid: parse_number(cell(columns.mid)),
        mod_duration: parse_number(cell(columns.mod_duration)),
        high: parse_number(cell(columns.high)),
        low: parse_number(cell(columns.low)),
        avg_daily_volume: parse_number(cell(columns.avg_daily_volume)),
        timestamp,
        size,
        client_side,
    })
}

/// Empty or unparsable numeric cells become NaN.
fn parse_number(raw: &str) -> f64 {
    raw.parse::<f64>().unwrap_or(f64::NAN)
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y%m%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d", "%m/%d/%Y"];

/// Accepts full timestamps and bare dates (taken as midnight).
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Compute a deterministic BLAKE3 hash over all grouped records.
///
/// Covers every field in instrument key order, so it does not depend on the
/// row order of the source table across instruments.
fn compute_dataset_hash(by_instrument: &BTreeMap<String, Vec<RfqRecord>>) -> String {
    let mut hasher = blake3::Hasher::new();

    for (instrument, records) in by_instrument {
        hasher.update(instrument.as_bytes());
        for r in records {
            hasher.update(&r.mid.to_le_bytes());
            hasher.update(&r.mod_duration.to_le_bytes());
            hasher.update(&r.high.to_le_bytes());
            hasher.update(&r.low.to_le_bytes());
            hasher.update(&r.avg_daily_volume.to_le_bytes());
            if let Some(ts) = r.timestamp {
                hasher.update(ts.to_string().as_bytes());
            }
            if let Some(size) = r.size {
                hasher.update(&size.to_le_bytes());
            }
            if let Some(side) = r.client_side {
                hasher.update(side.to_string().as_bytes());
            }
        }
    }

    hasher.finalize().to_hex().to_string()
}
