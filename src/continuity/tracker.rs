//! Continuity tracker
//!
//! Each identity tuple has at most one active signal group. A re-detection
//! inside the lookback window updates that group; otherwise a new group is
//! created. Inactive groups are never reactivated.

use crate::signal::Signal;
use crate::store::{window_start, SignalPatch, SignalStore, StoreError};
use crate::telemetry::{
    increment_counter, record_latency, set_gauge, CounterMetric, GaugeMetric, LatencyMetric,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Continuity configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContinuityConfig {
    /// How far back a previous detection still counts as the same group
    pub lookback_hours: i64,
    /// Staleness threshold for the sweep; 0 means expiry only
    pub stale_hours: i64,
}

impl Default for ContinuityConfig {
    fn default() -> Self {
        Self {
            lookback_hours: 24,
            stale_hours: 0,
        }
    }
}

/// What `process` did with a fresh signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// New group; carries the new row id
    Created(Uuid),
    /// Existing group updated; carries the existing row id
    Updated(Uuid),
}

/// Batch outcome counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ContinuityReport {
    pub new_count: usize,
    pub updated_count: usize,
    pub failed_count: usize,
}

/// Upserts fresh signals into the store by identity
pub struct ContinuityTracker<S: SignalStore> {
    store: Arc<S>,
    config: ContinuityConfig,
}

impl<S: SignalStore> ContinuityTracker<S> {
    pub fn new(store: Arc<S>, config: ContinuityConfig) -> Self {
        Self { store, config }
    }

    pub fn with_defaults(store: Arc<S>) -> Self {
        Self::new(store, ContinuityConfig::default())
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &ContinuityConfig {
        &self.config
    }

    /// Process one fresh signal at the current time
    pub async fn process(&self, signal: &Signal) -> Result<ProcessOutcome, StoreError> {
        self.process_at(signal, Utc::now()).await
    }

    /// Process one fresh signal as of `now`
    pub async fn process_at(
        &self,
        signal: &Signal,
        now: DateTime<Utc>,
    ) -> Result<ProcessOutcome, StoreError> {
        let key = signal.identity();
        let since = window_start(now, self.config.lookback_hours)?;

        if let Some(existing) = self.store.find_active_signal(&key, since).await? {
            let count = existing.detection_count.saturating_add(1);
            self.store
                .update_signal(existing.id, SignalPatch::redetection(signal, count, now))
                .await?;
            debug!(
                identity = %key,
                group = %existing.signal_group_id,
                detection_count = count,
                grade = %signal.grade,
                "Updated signal group"
            );
            return Ok(ProcessOutcome::Updated(existing.id));
        }

        // An active row outside the window is retired before a new group opens
        if let Some(old) = self
            .store
            .find_active_signal(&key, DateTime::<Utc>::MIN_UTC)
            .await?
        {
            self.store
                .update_signal(old.id, SignalPatch::deactivate())
                .await?;
            debug!(identity = %key, group = %old.signal_group_id, "Retired lapsed signal group");
        }

        let mut fresh = signal.clone();
        fresh.id = Uuid::new_v4();
        fresh.signal_group_id = fresh.id;
        fresh.first_detected_at = now;
        fresh.last_detected_at = now;
        fresh.detection_count = 1;
        fresh.is_active = true;

        let id = self.store.insert_signal(&fresh).await?;
        debug!(identity = %key, group = %id, grade = %fresh.grade, "Created signal group");
        Ok(ProcessOutcome::Created(id))
    }

    /// Process a batch; one failure never aborts the rest
    pub async fn process_signals(&self, signals: &[Signal]) -> ContinuityReport {
        self.process_signals_at(signals, Utc::now()).await
    }

    pub async fn process_signals_at(
        &self,
        signals: &[Signal],
        now: DateTime<Utc>,
    ) -> ContinuityReport {
        let start = Instant::now();
        let mut report = ContinuityReport::default();

        for signal in signals {
            match self.process_at(signal, now).await {
                Ok(ProcessOutcome::Created(_)) => report.new_count += 1,
                Ok(ProcessOutcome::Updated(_)) => report.updated_count += 1,
                Err(e) => {
                    report.failed_count += 1;
                    warn!(
                        ticker = %signal.ticker,
                        symbol = %signal.option_symbol,
                        error = %e,
                        "Continuity update failed"
                    );
                }
            }
        }

        increment_counter(CounterMetric::ContinuityCreated, report.new_count as u64);
        increment_counter(CounterMetric::ContinuityUpdated, report.updated_count as u64);
        increment_counter(CounterMetric::ContinuityFailed, report.failed_count as u64);
        record_latency(LatencyMetric::ContinuityBatch, start.elapsed());

        info!(
            new = report.new_count,
            updated = report.updated_count,
            failed = report.failed_count,
            "Continuity batch processed"
        );
        report
    }

    /// Deactivate expired and, with a positive threshold, stale signals
    pub async fn mark_stale(&self, hours_threshold: i64) -> Result<usize, StoreError> {
        self.mark_stale_at(Utc::now(), hours_threshold).await
    }

    pub async fn mark_stale_at(
        &self,
        now: DateTime<Utc>,
        hours_threshold: i64,
    ) -> Result<usize, StoreError> {
        let count = self
            .store
            .mark_expired_inactive(now, hours_threshold)
            .await?;
        increment_counter(CounterMetric::SignalsDeactivated, count as u64);

        if let Ok(active) = self.store.list_signals(true).await {
            set_gauge(GaugeMetric::ActiveSignals, active.len() as f64);
        }

        info!(deactivated = count, hours_threshold, "Stale sweep complete");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{Contract, OptionType};
    use crate::signal::{Grade, IdentityKey};
    use crate::store::MemorySignalStore;
    use async_trait::async_trait;
    use chrono::{Duration, NaiveDate, TimeZone};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 14, 30, 0).unwrap()
    }

    fn create_test_signal(symbol: &str, expiry: NaiveDate, score: Decimal) -> Signal {
        let contract = Contract {
            symbol: symbol.to_string(),
            ticker: "XYZ".to_string(),
            strike: dec!(100),
            expiry,
            option_type: OptionType::Call,
            last_price: dec!(3),
            bid: dec!(2.9),
            ask: dec!(3.1),
            volume: 2_000,
            open_interest: 4_000,
            implied_volatility: Some(dec!(0.3)),
            greeks: None,
            snapshot_time: t0(),
        };
        let mut signal = Signal::from_contract(&contract, dec!(100));
        signal.set_score(score);
        signal
    }

    fn expiry() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 11, 20).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_update() {
        let store = Arc::new(MemorySignalStore::new());
        let tracker = ContinuityTracker::with_defaults(store.clone());
        let signal = create_test_signal("XYZ-A", expiry(), dec!(0.70));

        let created = tracker.process_at(&signal, t0()).await.unwrap();
        let ProcessOutcome::Created(id) = created else {
            panic!("expected a new group");
        };
        let row = store.get(id).await.unwrap();
        assert_eq!(row.signal_group_id, id);
        assert_eq!(row.first_detected_at, t0());
        assert_eq!(row.detection_count, 1);
        assert!(row.is_active);

        let later = t0() + Duration::minutes(15);
        let updated = tracker.process_at(&signal, later).await.unwrap();
        assert_eq!(updated, ProcessOutcome::Updated(id));
        let row = store.get(id).await.unwrap();
        assert_eq!(row.detection_count, 2);
        assert_eq!(row.last_detected_at, later);
    }

    #[tokio::test]
    async fn test_oversized_lookback_is_an_error() {
        let store = Arc::new(MemorySignalStore::new());
        let tracker = ContinuityTracker::new(
            store.clone(),
            ContinuityConfig {
                lookback_hours: i64::MAX,
                ..ContinuityConfig::default()
            },
        );
        let signal = create_test_signal("XYZ-A", expiry(), dec!(0.70));

        let result = tracker.process_at(&signal, t0()).await;
        assert!(matches!(result, Err(StoreError::InvalidWindow(_))));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_redetection_upgrades_grade() {
        let store = Arc::new(MemorySignalStore::new());
        let tracker = ContinuityTracker::with_defaults(store.clone());

        let first = create_test_signal("XYZ-A", expiry(), dec!(0.70));
        assert_eq!(first.grade, Grade::B);
        let ProcessOutcome::Created(id) = tracker.process_at(&first, t0()).await.unwrap() else {
            panic!("expected a new group");
        };

        let second = create_test_signal("XYZ-A", expiry(), dec!(0.74));
        tracker
            .process_at(&second, t0() + Duration::minutes(15))
            .await
            .unwrap();

        let third = create_test_signal("XYZ-A", expiry(), dec!(0.86));
        tracker
            .process_at(&third, t0() + Duration::minutes(30))
            .await
            .unwrap();

        let row = store.get(id).await.unwrap();
        assert_eq!(row.grade, Grade::S);
        assert_eq!(row.overall_score, dec!(0.86));
        assert_eq!(row.detection_count, 3);
        assert_eq!(row.first_detected_at, t0());
        assert_eq!(row.signal_group_id, id);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_processing_twice_is_one_row() {
        let store = Arc::new(MemorySignalStore::new());
        let tracker = ContinuityTracker::with_defaults(store.clone());
        let signal = create_test_signal("XYZ-A", expiry(), dec!(0.66));

        tracker.process_at(&signal, t0()).await.unwrap();
        tracker.process_at(&signal, t0()).await.unwrap();

        let rows = store.list_signals(false).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].detection_count, 2);
    }

    #[tokio::test]
    async fn test_expired_group_is_not_reactivated() {
        let store = Arc::new(MemorySignalStore::new());
        let tracker = ContinuityTracker::with_defaults(store.clone());
        let past = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let signal = create_test_signal("XYZ-OLD", past, dec!(0.7));

        let ProcessOutcome::Created(old_id) = tracker.process_at(&signal, t0()).await.unwrap()
        else {
            panic!("expected a new group");
        };

        assert_eq!(tracker.mark_stale_at(t0(), 0).await.unwrap(), 1);
        assert_eq!(tracker.mark_stale_at(t0(), 0).await.unwrap(), 0);
        assert!(!store.get(old_id).await.unwrap().is_active);

        let again = tracker
            .process_at(&signal, t0() + Duration::minutes(15))
            .await
            .unwrap();
        let ProcessOutcome::Created(new_id) = again else {
            panic!("expected a fresh group");
        };
        assert_ne!(new_id, old_id);
        assert!(!store.get(old_id).await.unwrap().is_active);
        assert_eq!(store.get(new_id).await.unwrap().signal_group_id, new_id);
    }

    #[tokio::test]
    async fn test_lapsed_group_is_retired() {
        let store = Arc::new(MemorySignalStore::new());
        let tracker = ContinuityTracker::with_defaults(store.clone());
        let signal = create_test_signal("XYZ-A", expiry(), dec!(0.7));

        let ProcessOutcome::Created(old_id) = tracker.process_at(&signal, t0()).await.unwrap() else {
            panic!("expected a new group");
        };
        let outcome = tracker
            .process_at(&signal, t0() + Duration::hours(30))
            .await
            .unwrap();
        assert!(matches!(outcome, ProcessOutcome::Created(id) if id != old_id));
        assert_eq!(store.list_signals(true).await.unwrap().len(), 1);
        assert!(!store.get(old_id).await.unwrap().is_active);
    }

    /// Store that refuses inserts for one symbol
    struct FlakyStore {
        inner: MemorySignalStore,
        broken_symbol: String,
    }

    #[async_trait]
    impl SignalStore for FlakyStore {
        async fn find_active_signal(
            &self,
            key: &IdentityKey,
            since: DateTime<Utc>,
        ) -> Result<Option<Signal>, StoreError> {
            self.inner.find_active_signal(key, since).await
        }

        async fn insert_signal(&self, signal: &Signal) -> Result<Uuid, StoreError> {
            if signal.option_symbol == self.broken_symbol {
                return Err(StoreError::Io(std::io::Error::other("store unavailable")));
            }
            self.inner.insert_signal(signal).await
        }

        async fn update_signal(&self, id: Uuid, patch: SignalPatch) -> Result<(), StoreError> {
            self.inner.update_signal(id, patch).await
        }

        async fn mark_expired_inactive(
            &self,
            now: DateTime<Utc>,
            hours_threshold: i64,
        ) -> Result<usize, StoreError> {
            self.inner.mark_expired_inactive(now, hours_threshold).await
        }

        async fn list_signals(&self, active_only: bool) -> Result<Vec<Signal>, StoreError> {
            self.inner.list_signals(active_only).await
        }
    }

    #[tokio::test]
    async fn test_batch_contains_failures() {
        let store = Arc::new(FlakyStore {
            inner: MemorySignalStore::new(),
            broken_symbol: "XYZ-B".to_string(),
        });
        let tracker = ContinuityTracker::with_defaults(store.clone());

        let existing = create_test_signal("XYZ-C", expiry(), dec!(0.7));
        tracker.process_at(&existing, t0()).await.unwrap();

        let batch = vec![
            create_test_signal("XYZ-A", expiry(), dec!(0.7)),
            create_test_signal("XYZ-B", expiry(), dec!(0.7)),
            create_test_signal("XYZ-C", expiry(), dec!(0.8)),
        ];
        let report = tracker
            .process_signals_at(&batch, t0() + Duration::minutes(15))
            .await;

        assert_eq!(
            report,
            ContinuityReport {
                new_count: 1,
                updated_count: 1,
                failed_count: 1,
            }
        );
        assert_eq!(store.inner.len().await, 2);
    }
}
