// src/config/monitor.rs
use anyhow::{anyhow, bail, Context, Result};
use chrono::FixedOffset;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_CONFIG_PATH: &str = "MONITOR_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/monitor.toml";

/// One product page in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Product {
    pub slug: String,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "restock-watch/2.0".to_string(),
            timeout_secs: 30,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Single-product watcher target.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub name: String,
    pub url: String,
    pub state_path: PathBuf,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            name: "Crispy Savory".to_string(),
            url: "https://www.psychkosjerky.com/shop/p/crispy-savory".to_string(),
            state_path: PathBuf::from("restock_state.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub csv_path: PathBuf,
    /// Fixed offset all history timestamps are written in (and the chart is drawn in).
    pub utc_offset_hours: i32,
    pub low_stock_threshold: u64,
    /// Variant attribute holding the spice level, e.g. `"Spice Level": "Mild"`.
    pub variant_attribute: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("stock_history.csv"),
            utc_offset_hours: -8,
            low_stock_threshold: 5,
            variant_attribute: "Spice Level".to_string(),
        }
    }
}

impl HistoryConfig {
    pub fn offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .ok_or_else(|| anyhow!("utc_offset_hours out of range: {}", self.utc_offset_hours))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub output_path: PathBuf,
    /// How many recent sampling batches to draw.
    pub runs: usize,
    pub title: String,
    pub y_max: i64,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("stock_chart.png"),
            runs: 30,
            title: "Psych Ko's Jerky Stock Monitor".to_string(),
            y_max: 65,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Gateway base; the send URL is `{endpoint}/{sendkey}.send`.
    pub endpoint: String,
    /// Name of the env var holding the gateway secret.
    pub sendkey_env: String,
    pub timeout_secs: u64,
    /// Shop name used in report titles.
    pub brand: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://sctapi.ftqq.com".to_string(),
            sendkey_env: "SERVERCHAN_SENDKEY".to_string(),
            timeout_secs: 20,
            brand: "Psych Ko's Jerky".to_string(),
        }
    }
}

fn default_products() -> Vec<Product> {
    vec![
        Product {
            slug: "crispy-savory".to_string(),
            name: "Medium Crispy Savory".to_string(),
            url: "https://www.psychkosjerky.com/shop/p/crispy-savory".to_string(),
        },
        Product {
            slug: "crispy-lean".to_string(),
            name: "Extra Crispy Lean".to_string(),
            url: "https://www.psychkosjerky.com/shop/p/crispy-lean".to_string(),
        },
    ]
}

/// Everything a run needs. Built once at startup and passed down by reference.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub chart: ChartConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default = "default_products")]
    pub products: Vec<Product>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            watch: WatchConfig::default(),
            history: HistoryConfig::default(),
            chart: ChartConfig::default(),
            notify: NotifyConfig::default(),
            products: default_products(),
        }
    }
}

impl MonitorConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: MonitorConfig = toml::from_str(s).context("parsing monitor config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading monitor config from {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("in {}", path.display()))
    }

    /// Resolve the config:
    /// 1) explicit path (CLI flag)
    /// 2) $MONITOR_CONFIG_PATH
    /// 3) config/monitor.toml
    /// 4) built-in defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(p) = explicit {
            return Self::load_from(p);
        }
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                bail!("{ENV_CONFIG_PATH} points to non-existent path {}", pb.display());
            }
            return Self::load_from(&pb);
        }
        let default_p = Path::new(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from(default_p);
        }
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<()> {
        if !(-23..=23).contains(&self.history.utc_offset_hours) {
            bail!(
                "history.utc_offset_hours must be within -23..=23, got {}",
                self.history.utc_offset_hours
            );
        }
        if self.http.timeout_secs == 0 {
            bail!("http.timeout_secs must be > 0");
        }
        if self.notify.timeout_secs == 0 {
            bail!("notify.timeout_secs must be > 0");
        }
        if self.chart.runs == 0 {
            bail!("chart.runs must be > 0");
        }
        let mut seen = HashSet::new();
        for p in &self.products {
            if p.slug.trim().is_empty() {
                bail!("product slug must not be empty (url {})", p.url);
            }
            if !seen.insert(p.slug.as_str()) {
                bail!("duplicate product slug: {}", p.slug);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg = MonitorConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.products.len(), 2);
        assert_eq!(cfg.history.utc_offset_hours, -8);
        assert_eq!(cfg.http.timeout_secs, 30);
        assert_eq!(cfg.notify.sendkey_env, "SERVERCHAN_SENDKEY");
        assert_eq!(cfg.history.offset().unwrap().local_minus_utc(), -8 * 3600);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = MonitorConfig::from_toml_str(
            r#"
[history]
low_stock_threshold = 3

[[products]]
slug = "beef"
name = "Beef"
url = "https://example.test/beef"
"#,
        )
        .unwrap();
        assert_eq!(cfg.history.low_stock_threshold, 3);
        assert_eq!(cfg.history.csv_path, PathBuf::from("stock_history.csv"));
        assert_eq!(cfg.products.len(), 1);
        assert_eq!(cfg.products[0].slug, "beef");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(MonitorConfig::from_toml_str("[history]\nutc_offset_hours = 30").is_err());
        assert!(MonitorConfig::from_toml_str("[http]\ntimeout_secs = 0").is_err());
        assert!(MonitorConfig::from_toml_str("[chart]\nruns = 0").is_err());

        let dup = r#"
[[products]]
slug = "a"
name = "A"
url = "u1"

[[products]]
slug = "a"
name = "A again"
url = "u2"
"#;
        let err = MonitorConfig::from_toml_str(dup).unwrap_err();
        assert!(format!("{err:#}").contains("duplicate product slug"));
    }
}
