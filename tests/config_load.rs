// tests/config_load.rs
use restock_watch::config::monitor::ENV_CONFIG_PATH;
use restock_watch::MonitorConfig;
use std::{env, fs};

#[test]
fn load_from_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("monitor.toml");
    fs::write(
        &p,
        r#"
[watch]
url = "https://shop.test/p/x"
state_path = "state/x.json"

[chart]
runs = 12
"#,
    )
    .unwrap();
    let cfg = MonitorConfig::load(Some(p.as_path())).unwrap();
    assert_eq!(cfg.watch.url, "https://shop.test/p/x");
    assert_eq!(cfg.chart.runs, 12);
    assert_eq!(cfg.products.len(), 2);
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // isolate CWD so the repo's own config/ is not picked up
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    env::remove_var(ENV_CONFIG_PATH);

    // 1) nothing on disk -> built-in defaults
    let v = MonitorConfig::load(None).unwrap();
    assert_eq!(v.history.low_stock_threshold, 5);

    // 2) ./config/monitor.toml
    fs::create_dir_all(tmp.path().join("config")).unwrap();
    fs::write(
        tmp.path().join("config/monitor.toml"),
        "[history]\nlow_stock_threshold = 2\n",
    )
    .unwrap();
    assert_eq!(MonitorConfig::load(None).unwrap().history.low_stock_threshold, 2);

    // 3) env wins
    let p_env = tmp.path().join("other.toml");
    fs::write(&p_env, "[history]\nlow_stock_threshold = 9\n").unwrap();
    env::set_var(ENV_CONFIG_PATH, p_env.display().to_string());
    assert_eq!(MonitorConfig::load(None).unwrap().history.low_stock_threshold, 9);

    // 4) env pointing nowhere is an error
    env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
    assert!(MonitorConfig::load(None).is_err());
    env::remove_var(ENV_CONFIG_PATH);

    env::set_current_dir(&old).unwrap();
}

#[test]
fn shipped_example_config_parses() {
    let p = std::path::Path::new(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/config/monitor.example.toml"
    ));
    let cfg = MonitorConfig::load(Some(p)).unwrap();
    assert_eq!(cfg.products.len(), 2);
    assert_eq!(cfg.chart.runs, 30);
}
