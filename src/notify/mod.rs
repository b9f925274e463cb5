pub mod serverchan;

use anyhow::Result;

use crate::config::NotifyConfig;
pub use serverchan::ServerChanNotifier;

/// Title + Markdown body, as the push gateway takes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, n: &Notification) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// `--dry-run` sink: writes the message to the log and console, sends nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, n: &Notification) -> Result<()> {
        tracing::info!(title = %n.title, "dry-run notification");
        println!("[NOTIFY] {}\n{}\n", n.title, n.body);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Pick the sink for this run. Outside dry-run the gateway secret is required.
pub fn from_config(cfg: &NotifyConfig, dry_run: bool) -> Result<Box<dyn Notifier>> {
    if dry_run {
        return Ok(Box::new(LogNotifier));
    }
    Ok(Box::new(ServerChanNotifier::from_env(cfg)?))
}

/// Send once; failures are logged and swallowed. Returns whether it went out.
pub async fn deliver(notifier: &dyn Notifier, n: &Notification) -> bool {
    match notifier.send(n).await {
        Ok(()) => {
            tracing::info!(channel = notifier.name(), title = %n.title, "notified");
            true
        }
        Err(e) => {
            tracing::warn!(channel = notifier.name(), title = %n.title, "notify failed: {e:#}");
            false
        }
    }
}
