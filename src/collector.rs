// src/collector.rs
use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use std::collections::BTreeMap;

use crate::config::{MonitorConfig, Product};
use crate::fetch::PageSource;
use crate::history::{HistoryLog, StockObservation};
use crate::stock::{parse_variants, SpiceLevel, StockLevel};

/// What one product looked like in this batch. `levels` is `None` when the
/// page could not be fetched.
#[derive(Debug, Clone)]
pub struct ProductStock {
    pub product: Product,
    pub levels: Option<BTreeMap<SpiceLevel, StockLevel>>,
}

#[derive(Debug, Clone)]
pub struct CollectReport {
    pub collected_at: DateTime<FixedOffset>,
    pub products: Vec<ProductStock>,
    pub rows_written: usize,
}

/// One sampling batch over the whole catalog. Every row shares `now`.
///
/// A product whose page fails to load is skipped with a warning. Spice
/// levels missing from a page are not written; only real stock data ends up
/// in the log.
pub async fn collect(
    cfg: &MonitorConfig,
    source: &dyn PageSource,
    log: &HistoryLog,
    now: DateTime<FixedOffset>,
) -> Result<CollectReport> {
    let mut products = Vec::with_capacity(cfg.products.len());
    let mut rows = Vec::new();

    for product in &cfg.products {
        let html = match source.fetch(&product.url).await {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!(product = %product.slug, "fetch failed: {e:#}");
                products.push(ProductStock {
                    product: product.clone(),
                    levels: None,
                });
                continue;
            }
        };

        let levels = parse_variants(&html, &cfg.history.variant_attribute);
        for spice in SpiceLevel::ALL {
            match levels.get(&spice) {
                Some(stock) => rows.push(StockObservation::new(now, product, spice, *stock)),
                None => tracing::warn!(product = %product.slug, %spice, "variant missing, not recorded"),
            }
        }
        products.push(ProductStock {
            product: product.clone(),
            levels: Some(levels),
        });
    }

    if !rows.is_empty() {
        log.append(&rows)?;
    }
    tracing::info!(rows = rows.len(), path = %log.path().display(), "history appended");

    Ok(CollectReport {
        collected_at: now,
        products,
        rows_written: rows.len(),
    })
}
