//! Sold-out detection on a rendered product page.
//!
//! Only the badge marker decides. The plain-text checks in [`SignalReport`]
//! are kept for eyeballing a page when the badge and the shop disagree.

use once_cell::sync::Lazy;
use regex::Regex;

const PRODUCT_MARK_CLASS: &str = "product-mark";
const SOLD_OUT_CLASS: &str = "sold-out";

/// Opening tag; group 1 is the attribute list, quoted values may hold `>`.
static RE_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<[a-z][a-z0-9-]*((?:"[^"]*"|'[^']*'|[^"'>])*)>"#).expect("tag regex")
});

/// One attribute: name, then an optional double-quoted, single-quoted or bare value.
static RE_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)([^\s"'=<>/]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
        .expect("attribute regex")
});

/// Values of every attribute named exactly `class` (any case) in a tag's attribute list.
fn class_values(attrs: &str) -> impl Iterator<Item = &str> {
    RE_ATTR.captures_iter(attrs).filter_map(|caps| {
        if !caps[1].eq_ignore_ascii_case("class") {
            return None;
        }
        Some(
            caps.get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str())
                .unwrap_or_default(),
        )
    })
}

/// True iff some element carries both the `product-mark` and `sold-out` classes.
pub fn is_sold_out(html: &str) -> bool {
    RE_TAG.captures_iter(html).any(|caps| {
        let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        class_values(attrs).any(|classes| {
            has_class(classes, PRODUCT_MARK_CLASS) && has_class(classes, SOLD_OUT_CLASS)
        })
    })
}

fn has_class(classes: &str, wanted: &str) -> bool {
    classes
        .split_ascii_whitespace()
        .any(|c| c.eq_ignore_ascii_case(wanted))
}

/// Per-run diagnostics. `sold_out` is the decision; the rest is informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalReport {
    pub sold_out: bool,
    pub add_to_cart: bool,
    pub purchase: bool,
    pub sold_out_text: bool,
}

impl SignalReport {
    pub fn inspect(html: &str) -> Self {
        Self {
            sold_out: is_sold_out(html),
            add_to_cart: html.contains("Add to Cart"),
            purchase: html.contains("Purchase"),
            sold_out_text: html.contains("Sold Out"),
        }
    }

    pub fn log(&self, url: &str) {
        tracing::debug!(
            url,
            badge = self.sold_out,
            add_to_cart = self.add_to_cart,
            purchase = self.purchase,
            sold_out_text = self.sold_out_text,
            "page signals"
        );
    }
}
