//! Continuity across scan cycles with a controlled clock

use crate::common::*;
use chrono::{Duration, TimeZone, Utc};
use rust_decimal_macros::dec;
use std::sync::Arc;
use unusual_flow::chain::OptionType;
use unusual_flow::continuity::{ContinuityConfig, ContinuityTracker, ProcessOutcome};
use unusual_flow::signal::Signal;
use unusual_flow::store::{JsonFileStore, MemorySignalStore, SignalStore};

fn create_test_signal(symbol_strike: rust_decimal::Decimal) -> Signal {
    let snapshot = Utc.with_ymd_and_hms(2026, 10, 19, 14, 30, 0).unwrap();
    let contract =
        create_test_contract("XYZ", OptionType::Put, symbol_strike, 4_000, snapshot);
    let mut signal = Signal::from_contract(&contract, dec!(100));
    signal.set_score(dec!(0.72));
    signal
}

#[tokio::test]
async fn test_recurring_signal_across_three_scans() {
    let store = Arc::new(MemorySignalStore::new());
    let tracker = ContinuityTracker::with_defaults(store.clone());
    let t0 = Utc.with_ymd_and_hms(2026, 10, 19, 15, 0, 0).unwrap();
    let signal = create_test_signal(dec!(95));

    let first = tracker.process_at(&signal, t0).await.unwrap();
    let second = tracker
        .process_at(&signal, t0 + Duration::hours(2))
        .await
        .unwrap();
    let third = tracker
        .process_at(&signal, t0 + Duration::hours(5))
        .await
        .unwrap();

    let ProcessOutcome::Created(id) = first else {
        panic!("first sighting should create a group");
    };
    assert_eq!(second, ProcessOutcome::Updated(id));
    assert_eq!(third, ProcessOutcome::Updated(id));

    let row = store.get(id).await.unwrap();
    assert_eq!(row.detection_count, 3);
    assert_eq!(row.first_detected_at, t0);
    assert_eq!(row.last_detected_at, t0 + Duration::hours(5));
    assert_eq!(row.signal_group_id, id);
}

#[tokio::test]
async fn test_lapsed_signal_starts_new_group() {
    let store = Arc::new(MemorySignalStore::new());
    let tracker = ContinuityTracker::new(
        store.clone(),
        ContinuityConfig {
            lookback_hours: 24,
            ..ContinuityConfig::default()
        },
    );
    let t0 = Utc.with_ymd_and_hms(2026, 10, 19, 15, 0, 0).unwrap();
    let signal = create_test_signal(dec!(95));

    let ProcessOutcome::Created(old) = tracker.process_at(&signal, t0).await.unwrap() else {
        panic!("expected a new group");
    };
    let ProcessOutcome::Created(new) = tracker
        .process_at(&signal, t0 + Duration::hours(30))
        .await
        .unwrap()
    else {
        panic!("expected a second group after the lookback window");
    };

    assert_ne!(old, new);
    assert!(!store.get(old).await.unwrap().is_active);
    let active = store.list_signals(true).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, new);
}

#[tokio::test]
async fn test_sweep_deactivates_expired_and_stale() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(
        JsonFileStore::open(dir.path().join("signals.json"))
            .await
            .unwrap(),
    );
    let tracker = ContinuityTracker::with_defaults(store.clone());
    let t0 = Utc.with_ymd_and_hms(2026, 10, 19, 15, 0, 0).unwrap();

    let report = tracker
        .process_signals_at(&[create_test_signal(dec!(95)), create_test_signal(dec!(90))], t0)
        .await;
    assert_eq!(report.new_count, 2);
    tracker
        .process_at(&create_test_signal(dec!(90)), t0 + Duration::hours(40))
        .await
        .unwrap();

    // 95 strike last seen 48h ago, 90 strike 8h ago
    let swept = tracker
        .mark_stale_at(t0 + Duration::hours(48), 24)
        .await
        .unwrap();
    assert_eq!(swept, 1);
    let active = store.list_signals(true).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].strike, dec!(90));

    // Both contracts expire 30 days after the snapshot
    let swept = tracker.mark_stale_at(t0 + Duration::days(45), 0).await.unwrap();
    assert_eq!(swept, 1);
    assert!(store.list_signals(true).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unwritable_store_counts_failure_without_phantom_rows() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    let store = Arc::new(JsonFileStore::open(blocker.join("signals.json")).await.unwrap());
    std::fs::write(&blocker, b"").unwrap();
    let tracker = ContinuityTracker::with_defaults(store.clone());
    let t0 = Utc.with_ymd_and_hms(2026, 10, 19, 15, 0, 0).unwrap();

    let report = tracker
        .process_signals_at(&[create_test_signal(dec!(95))], t0)
        .await;
    assert_eq!(report.new_count, 0);
    assert_eq!(report.failed_count, 1);
    assert!(store.list_signals(true).await.unwrap().is_empty());

    // Once the path is writable the same signal creates a fresh group
    std::fs::remove_file(&blocker).unwrap();
    let report = tracker
        .process_signals_at(&[create_test_signal(dec!(95))], t0 + Duration::hours(1))
        .await;
    assert_eq!(report.new_count, 1);
    assert_eq!(store.list_signals(true).await.unwrap().len(), 1);
}
