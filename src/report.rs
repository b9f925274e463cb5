// src/report.rs
use crate::collector::{CollectReport, ProductStock};
use crate::notify::Notification;
use crate::stock::{SpiceLevel, StockStatus};

const NO_DATA: &str = "— no data";

fn status_line(p: &ProductStock, spice: SpiceLevel, low: u64) -> Option<StockStatus> {
    p.levels
        .as_ref()
        .and_then(|l| l.get(&spice))
        .map(|s| s.status(low))
}

fn markdown_status(s: StockStatus) -> String {
    match s {
        StockStatus::Unlimited => "∞ unlimited".to_string(),
        StockStatus::SoldOut => "❌ **sold out**".to_string(),
        StockStatus::Low(q) => format!("⚠️ **{q}** (low stock)"),
        StockStatus::InStock(q) => format!("✅ {q}"),
    }
}

/// Console lines for one product, as printed during `collect`.
pub fn console_lines(p: &ProductStock, low: u64) -> Vec<String> {
    let mut out = vec![format!("📦 {}", p.product.name)];
    if p.levels.is_none() {
        out.push(format!("   ❌ fetch failed {NO_DATA}"));
        return out;
    }
    for spice in SpiceLevel::ALL {
        let status = status_line(p, spice, low)
            .map(|s| s.to_string())
            .unwrap_or_else(|| NO_DATA.to_string());
        out.push(format!("   - {}: {status}", spice.title()));
    }
    out
}

/// Markdown daily report for the push gateway.
pub fn daily_report(report: &CollectReport, brand: &str, low: u64) -> Notification {
    let mut lines = vec![format!(
        "📅 **{}**\n",
        report.collected_at.format("%Y-%m-%d %H:%M")
    )];
    for p in &report.products {
        lines.push(format!("## 📦 {}\n", p.product.name));
        for spice in SpiceLevel::ALL {
            let status = status_line(p, spice, low)
                .map(markdown_status)
                .unwrap_or_else(|| NO_DATA.to_string());
            lines.push(format!("- {}: {status}", spice.title()));
        }
        lines.push(format!("\n🔗 [View product]({})\n", p.product.url));
    }
    Notification::new(format!("🥩 {brand} daily stock report"), lines.join("\n"))
}
