//! Report rows and the batch summary.
//!
//! Every metric is a pure reduction over rows. No dependency on the engine.

use serde::{Deserialize, Serialize};

/// Per-instrument backtest result. Created once when the instrument closes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReportRow {
    pub instrument: String,
    /// Realized cash plus mark-to-market of the closing inventory.
    pub total_pnl: f64,
    /// Filled volume over mean average daily volume (floored at 1).
    pub turnover_ratio: f64,
    /// Expected (or realized, under Bernoulli fills) hit ratio.
    pub capture_rate: f64,
    /// Size-weighted quote-vs-mid edge in bps. Positive = edge captured.
    pub avg_slippage_bps: f64,
    pub event_count: usize,
    pub skipped_events: usize,
    pub final_inventory: f64,
    pub realized_cash: f64,
    pub mark_to_market: f64,
}

impl BacktestReportRow {
    /// Row for an instrument with no priced events.
    pub fn empty(instrument: impl Into<String>) -> Self {
        Self {
            instrument: instrument.into(),
            total_pnl: 0.0,
            turnover_ratio: 0.0,
            capture_rate: 0.0,
            avg_slippage_bps: 0.0,
            event_count: 0,
            skipped_events: 0,
            final_inventory: 0.0,
            realized_cash: 0.0,
            mark_to_market: 0.0,
        }
    }
}

/// Batch-level reduction of the report table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub instrument_count: usize,
    pub total_pnl_sum: f64,
    pub mean_total_pnl: f64,
    pub mean_turnover_ratio: f64,
    pub mean_capture_rate: f64,
    pub mean_avg_slippage_bps: f64,
    pub rows: Vec<BacktestReportRow>,
}

/// Arithmetic mean of each metric across rows, plus the raw table.
///
/// An empty table yields a summary of zeros.
pub fn aggregate(rows: &[BacktestReportRow]) -> ReportSummary {
    ReportSummary {
        instrument_count: rows.len(),
        total_pnl_sum: rows.iter().map(|r| r.total_pnl).sum(),
        mean_total_pnl: mean(rows, |r| r.total_pnl),
        mean_turnover_ratio: mean(rows, |r| r.turnover_ratio),
        mean_capture_rate: mean(rows, |r| r.capture_rate),
        mean_avg_slippage_bps: mean(rows, |r| r.avg_slippage_bps),
        rows: rows.to_vec(),
    }
}

fn mean(rows: &[BacktestReportRow], metric: impl Fn(&BacktestReportRow) -> f64) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    rows.iter().map(metric).sum::<f64>() / rows.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(instrument: &str, pnl: f64, turnover: f64, capture: f64, slip: f64) -> BacktestReportRow {
        BacktestReportRow {
            instrument: instrument.into(),
            total_pnl: pnl,
            turnover_ratio: turnover,
            capture_rate: capture,
            avg_slippage_bps: slip,
            event_count: 3,
            ..BacktestReportRow::empty(instrument)
        }
    }

    #[test]
    fn empty_table_yields_zeros() {
        let s = aggregate(&[]);
        assert_eq!(s.instrument_count, 0);
        assert_eq!(s.total_pnl_sum, 0.0);
        assert_eq!(s.mean_total_pnl, 0.0);
        assert_eq!(s.mean_turnover_ratio, 0.0);
        assert_eq!(s.mean_capture_rate, 0.0);
        assert_eq!(s.mean_avg_slippage_bps, 0.0);
        assert!(s.rows.is_empty());
    }

    #[test]
    fn single_row_passes_through() {
        let r = row("AAA", 1234.5, 0.37, 0.61, -2.25);
        let s = aggregate(std::slice::from_ref(&r));
        assert_eq!(s.mean_total_pnl, r.total_pnl);
        assert_eq!(s.mean_turnover_ratio, r.turnover_ratio);
        assert_eq!(s.mean_capture_rate, r.capture_rate);
        assert_eq!(s.mean_avg_slippage_bps, r.avg_slippage_bps);
        assert_eq!(s.total_pnl_sum, r.total_pnl);
        assert_eq!(s.rows, vec![r]);
    }

    #[test]
    fn means_across_rows() {
        let rows = vec![row("A", 10.0, 1.0, 0.2, 4.0), row("B", 30.0, 3.0, 0.6, -2.0)];
        let s = aggregate(&rows);
        assert_eq!(s.instrument_count, 2);
        assert_eq!(s.total_pnl_sum, 40.0);
        assert_eq!(s.mean_total_pnl, 20.0);
        assert_eq!(s.mean_turnover_ratio, 2.0);
        assert!((s.mean_capture_rate - 0.4).abs() < 1e-12);
        assert_eq!(s.mean_avg_slippage_bps, 1.0);
    }
}
