//! Scan pipeline: file snapshots -> scanner -> JSON store -> Parquet

use crate::common::*;
use chrono::Utc;
use std::sync::Arc;
use unusual_flow::continuity::ContinuityTracker;
use unusual_flow::data::SignalParquetWriter;
use unusual_flow::provider::{CacheConfig, CachedProvider, FileChainProvider};
use unusual_flow::scan::{ScanConfig, ScanError, Scanner};
use unusual_flow::signal::Grade;
use unusual_flow::store::{JsonFileStore, SignalStore};

fn fast_config() -> ScanConfig {
    ScanConfig {
        cooldown_secs: 0,
        ..ScanConfig::default()
    }
}

#[tokio::test]
async fn test_scan_cycle_persists_signals() {
    let snapshots = tempfile::tempdir().unwrap();
    let now = Utc::now();
    write_snapshot(
        snapshots.path(),
        &create_test_chain("XYZ", now),
        Some(&create_test_baseline("XYZ")),
    );
    write_snapshot(
        snapshots.path(),
        &create_test_chain("ABC", now),
        Some(&create_test_baseline("ABC")),
    );

    let scanner = Scanner::new(FileChainProvider::new(snapshots.path()), fast_config());
    let store_dir = tempfile::tempdir().unwrap();
    let store_path = store_dir.path().join("signals.json");
    let store = Arc::new(JsonFileStore::open(&store_path).await.unwrap());
    let tracker = ContinuityTracker::with_defaults(store.clone());

    let report = scanner
        .run_cycle(&tickers(&["XYZ", "ABC", "MISSING"]), &tracker)
        .await
        .unwrap();

    assert_eq!(report.scan.summary.tickers_scanned, 3);
    assert_eq!(report.scan.summary.unavailable, 1);
    assert_eq!(report.scan.signals.len(), 2);
    assert!(report.scan.signals.iter().all(|s| s.grade >= Grade::C));
    assert_eq!(report.continuity.new_count, 2);
    assert_eq!(report.continuity.failed_count, 0);

    // Reopen from disk
    let reopened = JsonFileStore::open(&store_path).await.unwrap();
    let active = reopened.list_signals(true).await.unwrap();
    assert_eq!(active.len(), 2);
    assert!(active.iter().all(|s| s.detection_count == 1));
    assert!(active.iter().all(|s| s.signal_group_id == s.id));
}

#[tokio::test]
async fn test_repeat_scan_updates_existing_groups() {
    let snapshots = tempfile::tempdir().unwrap();
    write_snapshot(
        snapshots.path(),
        &create_test_chain("XYZ", Utc::now()),
        Some(&create_test_baseline("XYZ")),
    );

    let provider = CachedProvider::new(
        FileChainProvider::new(snapshots.path()),
        &CacheConfig::default(),
    );
    let scanner = Scanner::new(provider, fast_config());
    let store_dir = tempfile::tempdir().unwrap();
    let store = Arc::new(
        JsonFileStore::open(store_dir.path().join("signals.json"))
            .await
            .unwrap(),
    );
    let tracker = ContinuityTracker::with_defaults(store.clone());

    let first = scanner.run_cycle(&tickers(&["XYZ"]), &tracker).await.unwrap();
    assert_eq!(first.continuity.new_count, 1);
    let original = store.list_signals(true).await.unwrap().remove(0);

    let second = scanner.run_cycle(&tickers(&["XYZ"]), &tracker).await.unwrap();
    assert_eq!(second.continuity.new_count, 0);
    assert_eq!(second.continuity.updated_count, 1);

    let rows = store.list_signals(false).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, original.id);
    assert_eq!(rows[0].signal_group_id, original.signal_group_id);
    assert_eq!(rows[0].first_detected_at, original.first_detected_at);
    assert_eq!(rows[0].detection_count, 2);
}

#[tokio::test]
async fn test_all_tickers_rate_limited_or_missing_data() {
    let snapshots = tempfile::tempdir().unwrap();
    let scanner = Scanner::new(FileChainProvider::new(snapshots.path()), fast_config());

    // Missing data is not an outage
    let report = scanner.scan(&tickers(&["AAA", "BBB"])).await.unwrap();
    assert_eq!(report.summary.unavailable, 2);
    assert!(report.signals.is_empty());

    std::fs::write(snapshots.path().join("BAD.chain.json"), b"{oops").unwrap();
    let result = scanner.scan(&tickers(&["BAD"])).await;
    assert!(matches!(result, Err(ScanError::ProviderOutage { tickers: 1 })));
}

#[tokio::test]
async fn test_scan_then_export_parquet() {
    let snapshots = tempfile::tempdir().unwrap();
    let now = Utc::now();
    write_snapshot(
        snapshots.path(),
        &create_test_chain("XYZ", now),
        Some(&create_test_baseline("XYZ")),
    );
    let scanner = Scanner::new(FileChainProvider::new(snapshots.path()), fast_config());
    let report = scanner.scan(&tickers(&["XYZ"])).await.unwrap();
    assert_eq!(report.signals.len(), 1);

    let out = tempfile::tempdir().unwrap();
    let writer = SignalParquetWriter::new(out.path());
    let path = writer.write(&report.signals, now).unwrap().unwrap();
    assert!(path.exists());
    assert_eq!(path, writer.file_path(now));
}

#[tokio::test]
async fn test_missing_baseline_still_grades() {
    let snapshots = tempfile::tempdir().unwrap();
    write_snapshot(snapshots.path(), &create_test_chain("XYZ", Utc::now()), None);

    let scanner = Scanner::new(FileChainProvider::new(snapshots.path()), fast_config());
    let report = scanner.scan(&tickers(&["XYZ"])).await.unwrap();
    assert_eq!(report.summary.failed, 0);
    assert!(report.summary.graded >= 1);
}
