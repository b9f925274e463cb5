// src/fetch.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use crate::config::HttpConfig;

/// Anything that can hand back a product page body.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Plain GET with a descriptive user agent and a whole-request timeout.
/// No retries: a failed fetch is returned to the caller as is.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(cfg: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.timeout())
            .build()
            .context("building http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url} non-2xx"))?;
        let body = resp
            .text()
            .await
            .with_context(|| format!("reading body of {url}"))?;
        tracing::debug!(url, bytes = body.len(), "page fetched");
        Ok(body)
    }
}
