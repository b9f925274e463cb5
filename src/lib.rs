// src/lib.rs
// Public library surface for the CLI, the demo bin and integration tests.

pub mod config;
pub mod fetch;
pub mod signal;
pub mod state;
pub mod stock;

// single-product watcher
pub mod change_detector;
pub mod notify;

// multi-product history + chart
pub mod chart;
pub mod collector;
pub mod history;
pub mod report;

pub use crate::config::MonitorConfig;
pub use crate::notify::{Notification, Notifier};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber.
/// `RUST_LOG` wins; `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("restock_watch=info,warn"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry
            .with(fmt::layer().compact().with_target(false))
            .init();
    }
}
