// tests/collect_pipeline.rs
mod common;

use chrono::{FixedOffset, TimeZone};
use common::{FixturePages, CONTEXT_HTML, CONTEXT_PARTIAL_HTML};
use restock_watch::collector::collect;
use restock_watch::config::{MonitorConfig, Product};
use restock_watch::history::HistoryLog;
use restock_watch::report::daily_report;
use restock_watch::stock::SpiceLevel;

fn cfg_with(products: &[(&str, &str)]) -> MonitorConfig {
    MonitorConfig {
        products: products
            .iter()
            .map(|(slug, url)| Product {
                slug: slug.to_string(),
                name: format!("Jerky {slug}"),
                url: url.to_string(),
            })
            .collect(),
        ..MonitorConfig::default()
    }
}

fn pst() -> FixedOffset {
    FixedOffset::west_opt(8 * 3600).unwrap()
}

#[tokio::test]
async fn one_batch_shares_a_timestamp() {
    let dir = tempfile::tempdir().unwrap();
    let log = HistoryLog::new(dir.path().join("stock_history.csv"));
    let cfg = cfg_with(&[("lean", "https://shop.test/lean")]);
    let pages = FixturePages::default().with("https://shop.test/lean", CONTEXT_HTML);
    let now = pst().with_ymd_and_hms(2025, 11, 2, 9, 0, 0).unwrap();

    let report = collect(&cfg, &pages, &log, now).await.unwrap();
    assert_eq!(report.rows_written, 3);

    let rows = log.read_all(pst()).unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.unix_ts == Some(now.timestamp())));
    assert!(rows.iter().all(|r| r.timestamp == now));

    let levels: Vec<SpiceLevel> = rows.iter().map(|r| r.spice_level).collect();
    assert_eq!(levels, SpiceLevel::ALL.to_vec());
    assert!(rows[0].sold_out, "mild has quantity 0");
    assert_eq!(rows[1].quantity, 4);
    assert!(!rows[2].sold_out);
}

#[tokio::test]
async fn failed_product_is_skipped_and_missing_variants_not_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let log = HistoryLog::new(dir.path().join("stock_history.csv"));
    let cfg = cfg_with(&[
        ("down", "https://shop.test/down"),
        ("savory", "https://shop.test/savory"),
    ]);
    let pages = FixturePages::default().with("https://shop.test/savory", CONTEXT_PARTIAL_HTML);
    let now = pst().with_ymd_and_hms(2025, 11, 2, 9, 0, 0).unwrap();

    let report = collect(&cfg, &pages, &log, now).await.unwrap();
    assert_eq!(report.products.len(), 2);
    assert!(report.products[0].levels.is_none());
    assert_eq!(report.rows_written, 2);

    let rows = log.read_all(pst()).unwrap();
    let recorded: Vec<SpiceLevel> = rows.iter().map(|r| r.spice_level).collect();
    assert_eq!(recorded, vec![SpiceLevel::Medium, SpiceLevel::Spicy]);
    assert!(rows.iter().all(|r| r.product_slug == "savory"));
    // unlimited stock is never sold out
    assert!(rows[1].unlimited);
    assert!(!rows[1].sold_out);

    let n = daily_report(&report, "Shop", 5);
    assert!(n.body.contains("## 📦 Jerky down"));
    assert!(n.body.contains("- Mild: — no data"));
    assert!(n.body.contains("- Medium: ✅ 9"));
}

#[tokio::test]
async fn page_without_context_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stock_history.csv");
    let log = HistoryLog::new(&path);
    let cfg = cfg_with(&[("plain", "https://shop.test/plain")]);
    let pages = FixturePages::default().with("https://shop.test/plain", "<html></html>");
    let now = pst().with_ymd_and_hms(2025, 11, 2, 9, 0, 0).unwrap();

    let report = collect(&cfg, &pages, &log, now).await.unwrap();
    assert_eq!(report.rows_written, 0);
    assert!(!path.exists());
}
