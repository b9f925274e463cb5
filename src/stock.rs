// src/stock.rs
//! Per-variant stock as published in the shop's embedded page context.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpiceLevel {
    Mild,
    Medium,
    Spicy,
}

impl SpiceLevel {
    pub const ALL: [SpiceLevel; 3] = [SpiceLevel::Mild, SpiceLevel::Medium, SpiceLevel::Spicy];

    pub fn as_str(self) -> &'static str {
        match self {
            SpiceLevel::Mild => "mild",
            SpiceLevel::Medium => "medium",
            SpiceLevel::Spicy => "spicy",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            SpiceLevel::Mild => "Mild",
            SpiceLevel::Medium => "Medium",
            SpiceLevel::Spicy => "Spicy",
        }
    }
}

impl fmt::Display for SpiceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpiceLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mild" => Ok(SpiceLevel::Mild),
            "medium" => Ok(SpiceLevel::Medium),
            "spicy" => Ok(SpiceLevel::Spicy),
            other => Err(anyhow::anyhow!("unknown spice level: {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StockLevel {
    pub quantity: u64,
    pub unlimited: bool,
}

impl StockLevel {
    /// Unlimited stock is never sold out, whatever the quantity says.
    pub fn sold_out(&self) -> bool {
        !self.unlimited && self.quantity == 0
    }

    pub fn status(&self, low_threshold: u64) -> StockStatus {
        if self.unlimited {
            StockStatus::Unlimited
        } else if self.quantity == 0 {
            StockStatus::SoldOut
        } else if self.quantity <= low_threshold {
            StockStatus::Low(self.quantity)
        } else {
            StockStatus::InStock(self.quantity)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockStatus {
    Unlimited,
    SoldOut,
    Low(u64),
    InStock(u64),
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockStatus::Unlimited => f.write_str("∞ unlimited"),
            StockStatus::SoldOut => f.write_str("❌ sold out"),
            StockStatus::Low(q) => write!(f, "⚠️ {q} (low stock)"),
            StockStatus::InStock(q) => write!(f, "✅ {q}"),
        }
    }
}

static RE_CONTEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)Static\.SQUARESPACE_CONTEXT\s*=\s*(\{.+?\});\s*</script>")
        .expect("page context regex")
});

#[derive(Debug, Default, Deserialize)]
struct PageContext {
    #[serde(default)]
    product: Option<ProductContext>,
}

#[derive(Debug, Default, Deserialize)]
struct ProductContext {
    #[serde(default)]
    variants: Vec<VariantContext>,
}

#[derive(Debug, Default, Deserialize)]
struct VariantContext {
    #[serde(default)]
    attributes: HashMap<String, serde_json::Value>,
    #[serde(default)]
    stock: Option<StockContext>,
}

#[derive(Debug, Default, Deserialize)]
struct StockContext {
    #[serde(default)]
    quantity: Option<i64>,
    #[serde(default)]
    unlimited: Option<bool>,
}

/// Stock per spice level from the page's embedded context object.
///
/// A page without the context, or with one that does not parse, yields an
/// empty map. Variants with an unknown or missing spice level are skipped.
pub fn parse_variants(html: &str, attribute: &str) -> BTreeMap<SpiceLevel, StockLevel> {
    let mut out = BTreeMap::new();
    let Some(caps) = RE_CONTEXT.captures(html) else {
        tracing::warn!("page context not found");
        return out;
    };
    let ctx: PageContext = match serde_json::from_str(&caps[1]) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("page context did not parse: {e}");
            return out;
        }
    };

    let variants = ctx.product.map(|p| p.variants).unwrap_or_default();
    for v in variants {
        let Some(level) = v
            .attributes
            .get(attribute)
            .and_then(|x| x.as_str())
            .and_then(|s| s.parse::<SpiceLevel>().ok())
        else {
            continue;
        };
        let stock = v.stock.unwrap_or_default();
        out.insert(
            level,
            StockLevel {
                quantity: stock.quantity.unwrap_or(0).max(0) as u64,
                unlimited: stock.unlimited.unwrap_or(false),
            },
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(ctx: &str) -> String {
        format!(
            "<html><script>Static.SQUARESPACE_CONTEXT = {ctx};</script><script>x = {{}};</script></html>"
        )
    }

    #[test]
    fn sold_out_derivation() {
        for (q, u, expect) in [(0, false, true), (0, true, false), (3, false, false), (3, true, false)] {
            let s = StockLevel { quantity: q, unlimited: u };
            assert_eq!(s.sold_out(), expect, "q={q} unlimited={u}");
        }
    }

    #[test]
    fn status_thresholds() {
        let s = |q, u| StockLevel { quantity: q, unlimited: u }.status(5);
        assert_eq!(s(0, true), StockStatus::Unlimited);
        assert_eq!(s(0, false), StockStatus::SoldOut);
        assert_eq!(s(5, false), StockStatus::Low(5));
        assert_eq!(s(6, false), StockStatus::InStock(6));
    }

    #[test]
    fn parses_variants_case_insensitively() {
        let html = page(
            r#"{"product":{"variants":[
                {"attributes":{"Spice Level":"Mild"},"stock":{"quantity":12,"unlimited":false}},
                {"attributes":{"Spice Level":"SPICY"},"stock":{"quantity":0,"unlimited":true}},
                {"attributes":{"Spice Level":"Ghost"},"stock":{"quantity":9}},
                {"attributes":{},"stock":{"quantity":1}}
            ]}}"#,
        );
        let v = parse_variants(&html, "Spice Level");
        assert_eq!(v.len(), 2);
        assert_eq!(v[&SpiceLevel::Mild], StockLevel { quantity: 12, unlimited: false });
        assert!(v[&SpiceLevel::Spicy].unlimited);
        assert!(!v.contains_key(&SpiceLevel::Medium));
    }

    #[test]
    fn null_stock_fields_do_not_blank_the_page() {
        let html = page(
            r#"{"product":{"variants":[
                {"attributes":{"Spice Level":"Mild"},"stock":{"quantity":null,"unlimited":false}},
                {"attributes":{"Spice Level":"Medium"},"stock":{"quantity":4,"unlimited":null}},
                {"attributes":{"Spice Level":"Spicy"},"stock":null}
            ]}}"#,
        );
        let v = parse_variants(&html, "Spice Level");
        assert_eq!(v.len(), 3);
        assert!(v[&SpiceLevel::Mild].sold_out());
        assert!(v[&SpiceLevel::Spicy].sold_out());
        assert_eq!(v[&SpiceLevel::Medium], StockLevel { quantity: 4, unlimited: false });
    }

    #[test]
    fn missing_or_broken_context_is_empty() {
        assert!(parse_variants("<html>no context</html>", "Spice Level").is_empty());
        assert!(parse_variants(&page("{broken"), "Spice Level").is_empty());
        assert!(parse_variants(&page(r#"{"website":{}}"#), "Spice Level").is_empty());
    }
}
