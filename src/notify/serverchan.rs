use anyhow::{anyhow, bail, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{Notification, Notifier};
use crate::config::NotifyConfig;

/// Push-gateway client: form POST of `title` + `desp` to `{endpoint}/{sendkey}.send`.
#[derive(Clone)]
pub struct ServerChanNotifier {
    send_url: String,
    client: Client,
    timeout: Duration,
}

/// Gateway reply; `code == 0` means accepted.
#[derive(Debug, Deserialize)]
struct GatewayReply {
    code: i64,
    #[serde(default)]
    message: Option<String>,
}

impl ServerChanNotifier {
    pub fn new(endpoint: &str, sendkey: &str) -> Self {
        Self {
            send_url: format!("{}/{}.send", endpoint.trim_end_matches('/'), sendkey),
            client: Client::new(),
            timeout: Duration::from_secs(20),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Reads the secret from `cfg.sendkey_env`; absent or blank is an error.
    pub fn from_env(cfg: &NotifyConfig) -> Result<Self> {
        let key = std::env::var(&cfg.sendkey_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow!("Missing {} env var", cfg.sendkey_env))?;
        Ok(Self::new(&cfg.endpoint, key.trim()).with_timeout(cfg.timeout_secs))
    }
}

#[async_trait::async_trait]
impl Notifier for ServerChanNotifier {
    async fn send(&self, n: &Notification) -> Result<()> {
        let rsp = self
            .client
            .post(&self.send_url)
            .timeout(self.timeout)
            .form(&[("title", n.title.as_str()), ("desp", n.body.as_str())])
            .send()
            .await
            // the URL carries the secret; keep it out of the error text
            .map_err(|e| anyhow!("push gateway request failed: {}", e.without_url()))?;

        let status = rsp.status();
        if !status.is_success() {
            bail!("push gateway HTTP {status}");
        }

        let body = rsp
            .text()
            .await
            .map_err(|e| anyhow!("reading push gateway reply: {}", e.without_url()))?;
        tracing::debug!(reply = %body, "push gateway reply");
        let reply: GatewayReply = serde_json::from_str(&body)
            .with_context(|| format!("unexpected push gateway reply: {body}"))?;
        if reply.code != 0 {
            bail!(
                "push gateway rejected message (code {}): {}",
                reply.code,
                reply.message.as_deref().unwrap_or("unknown error")
            );
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "serverchan"
    }
}
