//! The shipped example configuration

use tokio_test::{assert_err, assert_ok};
use unusual_flow::config::Config;
use unusual_flow::signal::Grade;

#[test]
fn test_config_example_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml.example");
    let config = assert_ok!(Config::load(path));
    assert!(!config.tickers.is_empty());
    assert_eq!(config.filter.min_grade, Grade::C);
    assert!(config.detector.high_volume_tickers.contains("SPY"));
    assert_eq!(config.scan.per_ticker_cap, 3);
    assert!(config.cache.enabled);
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[scan]\nbatch_size = 0\n").unwrap();
    assert_err!(Config::load(&path));
}
