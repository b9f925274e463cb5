// Shared test doubles for the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use restock_watch::fetch::PageSource;
use restock_watch::{Notification, Notifier};

pub const SOLD_OUT_HTML: &str = include_str!("../fixtures/product_sold_out.html");
pub const IN_STOCK_HTML: &str = include_str!("../fixtures/product_in_stock.html");
pub const CONTEXT_HTML: &str = include_str!("../fixtures/product_context.html");
pub const CONTEXT_PARTIAL_HTML: &str = include_str!("../fixtures/product_context_partial.html");

/// url -> page body; unknown urls fail like a network error.
#[derive(Default)]
pub struct FixturePages {
    pages: HashMap<String, String>,
}

impl FixturePages {
    pub fn with(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }
}

#[async_trait::async_trait]
impl PageSource for FixturePages {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("connection refused: {url}"))
    }
}

/// Records every message; optionally fails every send.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, n: &Notification) -> Result<()> {
        self.sent.lock().unwrap().push(n.clone());
        if self.fail {
            return Err(anyhow!("gateway down"));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
