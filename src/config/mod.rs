pub mod monitor;

pub use monitor::{
    ChartConfig, HistoryConfig, HttpConfig, MonitorConfig, NotifyConfig, Product, WatchConfig,
};
