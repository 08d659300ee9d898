//! Reporting and export: JSON, CSV, and Markdown artifact generation.
//!
//! Provides three export formats for batch runs:
//! - **JSON**: the full run manifest with schema versioning, plus a bare summary
//! - **CSV**: the per-instrument report table and the optional fill tape
//! - **Markdown**: a human-readable run report
//!
//! The manifest carries a `schema_version` field. Unknown versions are
//! rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rfqlab_core::engine::EventOutcome;
use rfqlab_core::{BacktestReportRow, ReportSummary};

use crate::runner::{BacktestRun, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestRun` manifest to pretty JSON.
pub fn export_json(run: &BacktestRun) -> Result<String> {
    serde_json::to_string_pretty(run).context("failed to serialize BacktestRun to JSON")
}

/// Deserialize a `BacktestRun` manifest, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestRun> {
    let run: BacktestRun =
        serde_json::from_str(json).context("failed to deserialize BacktestRun from JSON")?;
    if run.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            run.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(run)
}

/// Serialize the batch summary alone.
pub fn export_summary_json(summary: &ReportSummary) -> Result<String> {
    serde_json::to_string_pretty(summary).context("failed to serialize ReportSummary to JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the report table, one row per instrument.
///
/// Columns: instrument, total_pnl, turnover_ratio, capture_rate,
/// avg_slippage_bps, event_count, skipped_events, final_inventory,
/// realized_cash, mark_to_market
pub fn export_report_csv(rows: &[BacktestReportRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for row in rows {
        wtr.serialize(row)
            .with_context(|| format!("failed to write report row for {}", row.instrument))?;
    }
    // serialize() only writes headers alongside the first record
    if rows.is_empty() {
        wtr.write_record(REPORT_COLUMNS)?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

const REPORT_COLUMNS: [&str; 10] = [
    "instrument",
    "total_pnl",
    "turnover_ratio",
    "capture_rate",
    "avg_slippage_bps",
    "event_count",
    "skipped_events",
    "final_inventory",
    "realized_cash",
    "mark_to_market",
];

/// Export the per-event fill tape.
pub fn export_fills_csv(events: &[EventOutcome]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "instrument",
        "sequence",
        "timestamp",
        "client_side",
        "dealer_side",
        "mid",
        "quoted_price",
        "reservation_price",
        "half_spread",
        "spread_bps",
        "fill_probability",
        "requested_size",
        "filled_size",
        "slippage_bps",
        "expected_pnl",
        "dv01",
        "inventory_after",
        "cash_after",
    ])?;

    for e in events {
        let q = &e.quote;
        wtr.write_record([
            &e.instrument,
            &e.sequence.to_string(),
            &e.timestamp.map(|t| t.to_string()).unwrap_or_default(),
            &e.client_side.to_string(),
            &q.dealer_side.to_string(),
            &format!("{:.6}", e.mid),
            &format!("{:.6}", q.quoted_price),
            &format!("{:.6}", q.reservation_price),
            &format!("{:.6}", q.half_spread),
            &format!("{:.4}", q.spread_bps),
            &format!("{:.6e}", q.fill_probability),
            &format!("{:.2}", q.size),
            &format!("{:.2}", e.filled_size),
            &format!("{:.4}", e.slippage_bps),
            &format!("{:.6e}", q.expected_pnl),
            &format!("{:.4}", q.dv01),
            &format!("{:.2}", e.inventory_after),
            &format!("{:.2}", e.cash_after),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a batch run.
///
/// Creates a directory named `{run_id[..12]}_{timestamp}/` under `output_dir`
/// containing:
/// - `manifest.json`: the full `BacktestRun`
/// - `summary.json`: the aggregated summary
/// - `report.csv`: one row per instrument
/// - `report.md`: Markdown report
/// - `fills.csv`: fill tape, only when events were recorded
///
/// Returns the path to the created directory.
pub fn save_artifacts(run: &BacktestRun, output_dir: &Path) -> Result<PathBuf> {
    let short_id = run.run_id.get(..12).unwrap_or(&run.run_id);
    let dirname = format!("{}_{}", short_id, run.created_at.format("%Y%m%d_%H%M%S"));
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    write(&run_dir.join("manifest.json"), &export_json(run)?)?;
    write(
        &run_dir.join("summary.json"),
        &export_summary_json(&run.summary)?,
    )?;
    write(
        &run_dir.join("report.csv"),
        &export_report_csv(&run.summary.rows)?,
    )?;
    write(&run_dir.join("report.md"), &generate_report(run))?;
    if !run.events.is_empty() {
        write(&run_dir.join("fills.csv"), &export_fills_csv(&run.events)?)?;
    }

    Ok(run_dir)
}

fn write(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

/// Load a `BacktestRun` from an artifact directory's manifest.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<BacktestRun> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

// ─── Markdown reports ───────────────────────────────────────────────

/// Generate a Markdown report for a batch run.
pub fn generate_report(run: &BacktestRun) -> String {
    let s = &run.summary;
    let params = &run.config.params;
    let settings = &run.config.backtest;
    let mut md = String::with_capacity(2048);

    md.push_str("# RFQ Backtest Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Run ID | `{}` |\n", run.run_id));
    md.push_str(&format!("| Dataset Hash | `{}` |\n", run.dataset_hash));
    md.push_str(&format!(
        "| Created | {} |\n",
        run.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    md.push_str(&format!(
        "| Rows | {} ({} dropped) |\n",
        run.row_count, run.dropped_rows
    ));
    md.push_str(&format!("| Skipped Events | {} |\n", run.skipped_events()));
    md.push('\n');

    md.push_str("## Model\n\n");
    md.push_str("| Parameter | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| gamma | {} |\n", params.gamma()));
    md.push_str(&format!("| A | {} |\n", params.a()));
    md.push_str(&format!("| k_paper | {} |\n", params.k_paper()));
    md.push_str(&format!(
        "| beta | ({}, {}, {}) |\n",
        params.beta_0(),
        params.beta_1(),
        params.beta_2()
    ));
    md.push_str(&format!("| Volatility | {:?} |\n", settings.volatility));
    md.push_str(&format!("| Fill Model | {:?} |\n", settings.fill_model));
    md.push_str(&format!(
        "| Default RFQ Size | {} |\n",
        settings.default_rfq_size
    ));
    md.push('\n');

    md.push_str("## Summary\n\n");
    md.push_str(&format!("- Instruments: {}\n", s.instrument_count));
    md.push_str(&format!("- Total PnL: {:+.2}\n", s.total_pnl_sum));
    md.push_str(&format!("- Mean PnL: {:+.2}\n", s.mean_total_pnl));
    md.push_str(&format!("- Mean Turnover: {:.4}\n", s.mean_turnover_ratio));
    md.push_str(&format!("- Mean Capture: {:.2}%\n", s.mean_capture_rate * 100.0));
    md.push_str(&format!(
        "- Mean Slippage: {:+.2} bps\n",
        s.mean_avg_slippage_bps
    ));

    if !s.rows.is_empty() {
        md.push_str("\n## Instruments\n\n");
        md.push_str(
            "| Instrument | Events | Skipped | PnL | Turnover | Capture | Slippage (bps) | Inventory |\n",
        );
        md.push_str("| --- | ---: | ---: | ---: | ---: | ---: | ---: | ---: |\n");
        for r in &s.rows {
            md.push_str(&format!(
                "| {} | {} | {} | {:+.2} | {:.4} | {:.2}% | {:+.2} | {:.2} |\n",
                r.instrument,
                r.event_count,
                r.skipped_events,
                r.total_pnl,
                r.turnover_ratio,
                r.capture_rate * 100.0,
                r.avg_slippage_bps,
                r.final_inventory
            ));
        }
    }

    if !run.warnings.is_empty() {
        md.push_str(&format!("\n## Warnings ({})\n\n", run.warnings.len()));
        for w in run.warnings.iter().take(20) {
            md.push_str(&format!("- {w}\n"));
        }
        if run.warnings.len() > 20 {
            md.push_str(&format!("- ... and {} more\n", run.warnings.len() - 20));
        }
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::data_loader::load_events_from_reader;
    use crate::runner::run_backtest_from_data;

    const TABLE: &str = "\
cusip_id,pr,mod_dur,prc_hi,prc_lo,qvolume,rfq_size,client_side
A,100.25,6.5,100.75,99.9,15000,2000,BUY
B,99.0,4.0,99.5,98.5,1000,500,SELL
";

    fn sample_run() -> BacktestRun {
        let loaded = load_events_from_reader(TABLE.as_bytes()).unwrap();
        let mut config = RunConfig::default();
        config.execution.record_events = true;
        run_backtest_from_data(&config, &loaded).unwrap()
    }

    #[test]
    fn json_round_trip() {
        let run = sample_run();
        let json = export_json(&run).unwrap();
        let back = import_json(&json).unwrap();
        assert_eq!(back.run_id, run.run_id);
        assert_eq!(back.summary, run.summary);
        assert_eq!(back.config, run.config);
    }

    #[test]
    fn rejects_future_schema_version() {
        let mut run = sample_run();
        run.schema_version = SCHEMA_VERSION + 1;
        let json = export_json(&run).unwrap();
        let err = import_json(&json).unwrap_err();
        assert!(err.to_string().contains("unsupported schema version"));
    }

    #[test]
    fn report_csv_has_header_and_rows() {
        let run = sample_run();
        let csv = export_report_csv(&run.summary.rows).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], REPORT_COLUMNS.join(","));
        assert!(lines[1].starts_with("A,"));
        assert!(lines[2].starts_with("B,"));
    }

    #[test]
    fn empty_report_csv_still_has_header() {
        let csv = export_report_csv(&[]).unwrap();
        assert_eq!(csv.trim_end(), REPORT_COLUMNS.join(","));
    }

    #[test]
    fn fills_csv_has_one_line_per_event() {
        let run = sample_run();
        let csv = export_fills_csv(&run.events).unwrap();
        assert_eq!(csv.lines().count(), 1 + run.events.len());
        assert!(csv.lines().nth(1).unwrap().starts_with("A,0,,BUY,SELL,"));
    }

    #[test]
    fn markdown_report_lists_instruments() {
        let run = sample_run();
        let md = generate_report(&run);
        assert!(md.starts_with("# RFQ Backtest Report"));
        assert!(md.contains(&run.run_id));
        assert!(md.contains("| A | 1 | 0 |"));
        assert!(md.contains("| B | 1 | 0 |"));
        assert!(!md.contains("## Warnings"));
    }
}
