// src/state.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// On-disk form: `{ "sold_out": bool, "ts": int }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorState {
    /// `None` only for a hand-written `null`; the store always writes a bool.
    pub sold_out: Option<bool>,
    #[serde(default)]
    pub ts: i64,
}

/// Last-known watcher state in a single JSON file, overwritten on every run.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Previous sold-out flag; `None` means unknown (first run).
    /// A file that exists but does not parse is an error.
    pub async fn load(&self) -> Result<Option<bool>> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", self.path.display()));
            }
        };
        let state: MonitorState = serde_json::from_str(&raw)
            .with_context(|| format!("corrupt state file {}", self.path.display()))?;
        Ok(state.sold_out)
    }

    pub async fn save(&self, sold_out: bool, ts: i64) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating state dir {}", dir.display()))?;
        }
        let state = MonitorState {
            sold_out: Some(sold_out),
            ts,
        };
        let body = serde_json::to_vec(&state).context("serializing state")?;
        fs::write(&self.path, body)
            .await
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}
