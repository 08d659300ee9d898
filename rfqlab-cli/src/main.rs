//! RFQLab CLI: batch backtests and single-quote simulation.
//!
//! Commands:
//! - `backtest`: replay an event table through the pricing engine, per instrument
//! - `quote`: price one RFQ against a given inventory and print the breakdown
//! - `config`: print the default run configuration as TOML

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rfqlab_core::{ClientSide, FillModel, MarketSnapshot, QuoteResult, RfqPricer};
use rfqlab_runner::{run_backtest, save_artifacts, BacktestRun, RunConfig};

#[derive(Parser)]
#[command(
    name = "rfqlab",
    about = "RFQLab CLI: inventory-aware RFQ pricing and event-driven backtesting"
)]
struct Cli {
    /// Debug-level logging (overrides RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a batch backtest over a CSV event table.
    Backtest {
        /// Path to the CSV event table.
        #[arg(long)]
        data: PathBuf,

        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory for run artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Skip writing artifacts; print the summary only.
        #[arg(long, default_value_t = false)]
        no_save: bool,

        /// Process instruments one at a time.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Size of a dedicated worker pool.
        #[arg(long)]
        threads: Option<usize>,

        /// Sample fills with this seed instead of crediting expected fills.
        #[arg(long)]
        seed: Option<u64>,

        /// Also write the per-event fill tape.
        #[arg(long, default_value_t = false)]
        fills: bool,

        /// Print the per-instrument table.
        #[arg(long, default_value_t = false)]
        detail: bool,
    },
    /// Price a single RFQ and print the quote breakdown.
    Quote {
        /// Mid price.
        #[arg(long)]
        mid: f64,

        /// Modified duration.
        #[arg(long)]
        duration: f64,

        /// Intraday high. Defaults to the mid.
        #[arg(long)]
        high: Option<f64>,

        /// Intraday low. Defaults to the mid.
        #[arg(long)]
        low: Option<f64>,

        /// Average daily volume.
        #[arg(long, default_value_t = 0.0)]
        adv: f64,

        /// Requested size.
        #[arg(long)]
        size: f64,

        /// Client side: BUY or SELL (B/S accepted).
        #[arg(long)]
        side: ClientSide,

        /// Current dealer inventory.
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        inventory: f64,

        /// Instrument label.
        #[arg(long, default_value = "RFQ")]
        instrument: String,

        /// TOML config supplying model parameters and the volatility proxy.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the default configuration as TOML.
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Backtest {
            data,
            config,
            output_dir,
            no_save,
            sequential,
            threads,
            seed,
            fills,
            detail,
        } => {
            let mut config = load_config(config.as_deref())?;
            if sequential {
                config.execution.parallel = false;
            }
            if threads.is_some() {
                config.execution.threads = threads;
            }
            if let Some(seed) = seed {
                config.backtest.fill_model = FillModel::Bernoulli { seed };
            }
            if fills {
                config.execution.record_events = true;
            }
            config.validate()?;
            run_batch_command(&config, &data, (!no_save).then_some(output_dir.as_path()), detail)
        }
        Commands::Quote {
            mid,
            duration,
            high,
            low,
            adv,
            size,
            side,
            inventory,
            instrument,
            config,
            json,
        } => {
            let config = load_config(config.as_deref())?;
            let snapshot = MarketSnapshot::new(
                instrument,
                mid,
                duration,
                high.unwrap_or(mid),
                low.unwrap_or(mid),
                adv,
            );
            let pricer = RfqPricer::new(config.params, inventory)
                .with_volatility_proxy(config.backtest.volatility);
            let quote = pricer
                .price(&snapshot, size, side)
                .context("cannot price RFQ")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&quote)?);
            } else {
                print_quote(&snapshot, inventory, side, &quote);
            }
            Ok(())
        }
        Commands::Config => {
            print!("{}", RunConfig::default().to_toml_string()?);
            Ok(())
        }
    }
}

/// Logs go to stderr so JSON output on stdout stays clean.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<RunConfig> {
    match path {
        Some(p) => RunConfig::from_file(p)
            .with_context(|| format!("failed to load config {}", p.display())),
        None => Ok(RunConfig::default()),
    }
}

fn run_batch_command(
    config: &RunConfig,
    data: &Path,
    output_dir: Option<&Path>,
    detail: bool,
) -> Result<()> {
    if !data.exists() {
        bail!("data file not found: {}", data.display());
    }
    info!(data = %data.display(), "starting batch backtest");

    let run = run_backtest(config, data)
        .with_context(|| format!("backtest failed for {}", data.display()))?;

    if detail {
        print_detail(&run);
    }
    print_summary(&run);

    if let Some(dir) = output_dir {
        let run_dir = save_artifacts(&run, dir)?;
        println!();
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn print_detail(run: &BacktestRun) {
    println!();
    println!("--- Per-Instrument Report ---");
    println!(
        "{:<14} {:>7} {:>7} {:>14} {:>10} {:>9} {:>10}",
        "instrument", "events", "skipped", "total_pnl", "turnover", "capture", "slip_bps"
    );
    for r in &run.summary.rows {
        println!(
            "{:<14} {:>7} {:>7} {:>14.2} {:>10.4} {:>8.2}% {:>10.2}",
            r.instrument,
            r.event_count,
            r.skipped_events,
            r.total_pnl,
            r.turnover_ratio,
            r.capture_rate * 100.0,
            r.avg_slippage_bps
        );
    }
}

fn print_summary(run: &BacktestRun) {
    let s = &run.summary;
    println!();
    println!("=== Backtest Summary ===");
    println!("Run ID:         {}", &run.run_id[..12]);
    println!("Dataset:        {}", &run.dataset_hash[..12]);
    println!("Fill Model:     {:?}", run.config.backtest.fill_model);
    println!("Instruments:    {}", s.instrument_count);
    println!(
        "Rows:           {} ({} dropped, {} skipped)",
        run.row_count,
        run.dropped_rows,
        run.skipped_events()
    );
    println!();
    println!("--- Performance ---");
    println!("Total PnL:      {:.2}", s.total_pnl_sum);
    println!("Avg PnL:        {:.2}", s.mean_total_pnl);
    println!("Avg Turnover:   {:.2}x", s.mean_turnover_ratio);
    println!("Avg Capture:    {:.2}%", s.mean_capture_rate * 100.0);
    println!("Avg Slippage:   {:.2} bps", s.mean_avg_slippage_bps);
    if !run.warnings.is_empty() {
        println!();
        println!("WARNING: {} events or rows were skipped (see log)", run.warnings.len());
    }
}

fn print_quote(snapshot: &MarketSnapshot, inventory: f64, side: ClientSide, quote: &QuoteResult) {
    println!();
    println!("=== Single RFQ ===");
    println!(
        "Instrument {} | mid {} | inventory {} | client {} | dealer {}",
        snapshot.instrument, snapshot.mid, inventory, side, quote.dealer_side
    );
    println!("{}", "-".repeat(36));
    for (name, value) in quote.fields() {
        if value != 0.0 && value.abs() < 1e-4 {
            println!("{name:<22}: {value:>12.4e}");
        } else {
            println!("{name:<22}: {value:>12.4}");
        }
    }
}
