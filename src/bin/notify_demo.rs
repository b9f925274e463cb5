//! Sends one sample restock notification through the configured gateway,
//! to check the send key. `--dry-run` prints it instead.

use restock_watch::change_detector::Transition;
use restock_watch::{notify, MonitorConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let dry_run = std::env::args().any(|a| a == "--dry-run");
    let cfg = MonitorConfig::load(None)?;
    let notifier = notify::from_config(&cfg.notify, dry_run)?;

    let msg = Transition::Restocked.notification(&cfg.watch.name, &cfg.watch.url);
    let ok = notify::deliver(notifier.as_ref(), &msg).await;

    println!("notify-demo done (delivered: {ok})");
    Ok(())
}
