//! restock-watch CLI entrypoint.
//!
//!   restock-watch                 collect one stock-history batch
//!   restock-watch --notify        ... and push the daily report
//!   restock-watch watch           single-product restock / sold-out alert
//!   restock-watch chart           render the stock chart

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use restock_watch::change_detector;
use restock_watch::chart;
use restock_watch::collector;
use restock_watch::fetch::HttpFetcher;
use restock_watch::history::HistoryLog;
use restock_watch::notify;
use restock_watch::report;
use restock_watch::state::StateStore;
use restock_watch::MonitorConfig;

#[derive(Debug, Parser)]
#[command(name = "restock-watch", version, about)]
struct Cli {
    /// Config file (TOML). Defaults to $MONITOR_CONFIG_PATH, then config/monitor.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print notifications instead of sending them.
    #[arg(long, global = true)]
    dry_run: bool,

    /// After collecting, also send the daily stock report.
    #[arg(long, global = true)]
    notify: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Append one sampling batch to the stock history (default).
    Collect,
    /// Check the watched product and notify on a stock transition.
    Watch,
    /// Render the stock history chart.
    Chart {
        /// Number of recent sampling batches to draw.
        #[arg(long)]
        runs: Option<usize>,
        /// Draw the whole history.
        #[arg(long, conflicts_with = "runs")]
        all: bool,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env in local/dev; harmless when absent.
    let _ = dotenvy::dotenv();
    restock_watch::init_tracing();

    let cli = Cli::parse();
    let cfg = MonitorConfig::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Collect) {
        Command::Collect => run_collect(&cfg, cli.notify, cli.dry_run).await,
        Command::Watch => run_watch(&cfg, cli.dry_run).await,
        Command::Chart { runs, all, output } => {
            let runs = if all {
                None
            } else {
                Some(runs.unwrap_or(cfg.chart.runs))
            };
            let out = output.unwrap_or_else(|| cfg.chart.output_path.clone());
            let n = chart::render_history(&cfg, runs, &out)?;
            println!("Chart saved: {} ({n} records)", out.display());
            Ok(())
        }
    }
}

async fn run_collect(cfg: &MonitorConfig, send_report: bool, dry_run: bool) -> Result<()> {
    // Resolve the notifier up front so a missing secret fails before any work.
    let notifier = if send_report {
        Some(notify::from_config(&cfg.notify, dry_run)?)
    } else {
        None
    };

    let tz = cfg.history.offset()?;
    let now = Utc::now().with_timezone(&tz);
    println!(
        "{} stock check - {} ({})",
        cfg.notify.brand,
        now.format("%Y-%m-%d %H:%M:%S"),
        if send_report { "collect + notify" } else { "collect only" }
    );

    let fetcher = HttpFetcher::new(&cfg.http)?;
    let log = HistoryLog::new(&cfg.history.csv_path);
    let result = collector::collect(cfg, &fetcher, &log, now).await?;

    for p in &result.products {
        for line in report::console_lines(p, cfg.history.low_stock_threshold) {
            println!("{line}");
        }
        println!();
    }

    if let Some(n) = notifier.as_deref() {
        let msg = report::daily_report(&result, &cfg.notify.brand, cfg.history.low_stock_threshold);
        notify::deliver(n, &msg).await;
    }

    println!("History appended to {}", log.path().display());
    Ok(())
}

async fn run_watch(cfg: &MonitorConfig, dry_run: bool) -> Result<()> {
    let notifier = notify::from_config(&cfg.notify, dry_run)?;
    let fetcher = HttpFetcher::new(&cfg.http)?;
    let store = StateStore::new(&cfg.watch.state_path);

    let outcome = change_detector::run_once(
        &cfg.watch,
        &fetcher,
        notifier.as_ref(),
        &store,
        Utc::now().timestamp(),
    )
    .await?;

    tracing::info!(
        previous = ?outcome.previous,
        sold_out = outcome.current,
        transition = ?outcome.transition,
        notified = outcome.notified,
        "watch run done"
    );
    Ok(())
}
