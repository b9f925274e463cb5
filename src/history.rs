//! history.rs: append-only CSV of stock observations.
//!
//! Header: `timestamp,unix_ts,product_slug,product_name,spice_level,quantity,unlimited,sold_out`.
//! Booleans are written as `True`/`False` so older logs and new rows read the same.

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::config::Product;
use crate::stock::{SpiceLevel, StockLevel};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockObservation {
    pub timestamp: DateTime<FixedOffset>,
    /// Missing only in logs written without the column.
    pub unix_ts: Option<i64>,
    pub product_slug: String,
    pub product_name: String,
    pub spice_level: SpiceLevel,
    pub quantity: u64,
    pub unlimited: bool,
    pub sold_out: bool,
}

impl StockObservation {
    pub fn new(
        timestamp: DateTime<FixedOffset>,
        product: &Product,
        spice_level: SpiceLevel,
        stock: StockLevel,
    ) -> Self {
        Self {
            timestamp,
            unix_ts: Some(timestamp.timestamp()),
            product_slug: product.slug.clone(),
            product_name: product.name.clone(),
            spice_level,
            quantity: stock.quantity,
            unlimited: stock.unlimited,
            sold_out: stock.sold_out(),
        }
    }
}

fn ser_py_bool<S: Serializer>(v: &bool, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(if *v { "True" } else { "False" })
}

fn de_py_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(d)?;
    match raw.trim() {
        "True" | "true" | "TRUE" | "1" => Ok(true),
        "False" | "false" | "FALSE" | "0" => Ok(false),
        other => Err(serde::de::Error::custom(format!("not a boolean: {other:?}"))),
    }
}

#[derive(Serialize)]
struct RecordOut<'a> {
    timestamp: String,
    unix_ts: Option<i64>,
    product_slug: &'a str,
    product_name: &'a str,
    spice_level: SpiceLevel,
    quantity: u64,
    #[serde(serialize_with = "ser_py_bool")]
    unlimited: bool,
    #[serde(serialize_with = "ser_py_bool")]
    sold_out: bool,
}

#[derive(Deserialize)]
struct RecordIn {
    timestamp: String,
    #[serde(default)]
    unix_ts: Option<i64>,
    product_slug: String,
    product_name: String,
    spice_level: String,
    quantity: u64,
    #[serde(deserialize_with = "de_py_bool")]
    unlimited: bool,
    #[serde(deserialize_with = "de_py_bool")]
    sold_out: bool,
}

/// Offset-aware ISO-8601, or a naive timestamp taken to be in `tz` already.
pub fn parse_timestamp(s: &str, tz: FixedOffset) -> Result<DateTime<FixedOffset>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            if let Some(dt) = tz.from_local_datetime(&naive).single() {
                return Ok(dt);
            }
        }
    }
    anyhow::bail!("unparseable timestamp {s:?}")
}

#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Append rows; the header goes in only when the file is created.
    pub fn append(&self, rows: &[StockObservation]) -> Result<()> {
        let fresh = !self.path.exists();
        if fresh {
            if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("creating {}", dir.display()))?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))?;
        let mut w = csv::WriterBuilder::new()
            .has_headers(fresh)
            .from_writer(file);
        for r in rows {
            w.serialize(RecordOut {
                timestamp: r.timestamp.to_rfc3339(),
                unix_ts: r.unix_ts,
                product_slug: &r.product_slug,
                product_name: &r.product_name,
                spice_level: r.spice_level,
                quantity: r.quantity,
                unlimited: r.unlimited,
                sold_out: r.sold_out,
            })
            .with_context(|| format!("writing row to {}", self.path.display()))?;
        }
        w.flush()
            .with_context(|| format!("flushing {}", self.path.display()))?;
        Ok(())
    }

    /// All rows in file order. Naive timestamps are read in `tz`.
    pub fn read_all(&self, tz: FixedOffset) -> Result<Vec<StockObservation>> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))?;
        let mut out = Vec::new();
        for (i, rec) in rdr.deserialize::<RecordIn>().enumerate() {
            // line 1 is the header
            let line = i + 2;
            let rec = rec.with_context(|| format!("{}:{line}", self.path.display()))?;
            out.push(StockObservation {
                timestamp: parse_timestamp(&rec.timestamp, tz)
                    .with_context(|| format!("{}:{line}", self.path.display()))?,
                unix_ts: rec.unix_ts,
                product_slug: rec.product_slug,
                product_name: rec.product_name,
                spice_level: rec
                    .spice_level
                    .parse()
                    .with_context(|| format!("{}:{line}", self.path.display()))?,
                quantity: rec.quantity,
                unlimited: rec.unlimited,
                sold_out: rec.sold_out,
            });
        }
        Ok(out)
    }
}
