use anyhow::Result;

use crate::config::WatchConfig;
use crate::fetch::PageSource;
use crate::notify::{self, Notification, Notifier};
use crate::signal::SignalReport;
use crate::state::StateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// in stock -> sold out
    SoldOut,
    /// sold out -> in stock
    Restocked,
}

impl Transition {
    pub fn notification(self, name: &str, url: &str) -> Notification {
        match self {
            Transition::SoldOut => {
                Notification::new(format!("{name} sold out"), format!("Now sold out.\n\n{url}"))
            }
            Transition::Restocked => Notification::new(
                format!("🛒 {name} restocked"),
                format!("Back in stock!\n\n{url}"),
            ),
        }
    }
}

/// `previous == None` is the first run: nothing to compare against.
pub fn detect(previous: Option<bool>, current: bool) -> Option<Transition> {
    match (previous?, current) {
        (false, true) => Some(Transition::SoldOut),
        (true, false) => Some(Transition::Restocked),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchOutcome {
    pub previous: Option<bool>,
    pub current: bool,
    pub transition: Option<Transition>,
    /// Whether the notifier accepted the message (false when none was due).
    pub notified: bool,
}

/// One watcher pass: load state, fetch, decide, notify at most once, persist.
///
/// A corrupt state file or a failed fetch ends the run before anything is
/// written. Notification failures are logged only; the new state is saved
/// either way.
pub async fn run_once(
    cfg: &WatchConfig,
    source: &dyn PageSource,
    notifier: &dyn Notifier,
    store: &StateStore,
    now_ts: i64,
) -> Result<WatchOutcome> {
    let previous = store.load().await?;
    let html = source.fetch(&cfg.url).await?;

    let signals = SignalReport::inspect(&html);
    signals.log(&cfg.url);
    let current = signals.sold_out;

    let transition = detect(previous, current);
    let mut notified = false;
    match transition {
        Some(t) => {
            let n = t.notification(&cfg.name, &cfg.url);
            notified = notify::deliver(notifier, &n).await;
        }
        None if previous.is_none() => {
            tracing::info!(sold_out = current, "first run, recording baseline");
        }
        None => tracing::debug!(sold_out = current, "no change"),
    }

    store.save(current, now_ts).await?;

    Ok(WatchOutcome {
        previous,
        current,
        transition,
        notified,
    })
}
