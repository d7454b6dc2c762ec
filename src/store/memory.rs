//! In-memory signal store

use super::{window_start, SignalPatch, SignalStore, StoreError};
use crate::signal::{IdentityKey, Signal};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Signal store backed by a map in memory
#[derive(Clone, Default)]
pub struct MemorySignalStore {
    signals: Arc<RwLock<HashMap<Uuid, Signal>>>,
}

impl MemorySignalStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with existing rows
    pub fn from_signals(signals: Vec<Signal>) -> Self {
        let map = signals.into_iter().map(|s| (s.id, s)).collect();
        Self {
            signals: Arc::new(RwLock::new(map)),
        }
    }

    /// All rows ordered by first detection, then id
    pub async fn snapshot(&self) -> Vec<Signal> {
        let signals = self.signals.read().await;
        let mut rows: Vec<Signal> = signals.values().cloned().collect();
        rows.sort_by(|a, b| {
            a.first_detected_at
                .cmp(&b.first_detected_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        rows
    }

    pub async fn len(&self) -> usize {
        self.signals.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.signals.read().await.is_empty()
    }

    pub async fn get(&self, id: Uuid) -> Option<Signal> {
        self.signals.read().await.get(&id).cloned()
    }

    /// Replace every row with `rows`
    pub async fn restore(&self, rows: Vec<Signal>) {
        let mut signals = self.signals.write().await;
        *signals = rows.into_iter().map(|s| (s.id, s)).collect();
    }
}

#[async_trait]
impl SignalStore for MemorySignalStore {
    async fn find_active_signal(
        &self,
        key: &IdentityKey,
        since: DateTime<Utc>,
    ) -> Result<Option<Signal>, StoreError> {
        let signals = self.signals.read().await;
        let found = signals
            .values()
            .filter(|s| s.is_active && s.last_detected_at >= since && &s.identity() == key)
            .max_by_key(|s| s.last_detected_at)
            .cloned();
        Ok(found)
    }

    async fn insert_signal(&self, signal: &Signal) -> Result<Uuid, StoreError> {
        let mut signals = self.signals.write().await;
        if signal.is_active {
            let key = signal.identity();
            if signals.values().any(|s| s.is_active && s.identity() == key) {
                return Err(StoreError::DuplicateActive(key.to_string()));
            }
        }
        signals.insert(signal.id, signal.clone());
        Ok(signal.id)
    }

    async fn update_signal(&self, id: Uuid, patch: SignalPatch) -> Result<(), StoreError> {
        let mut signals = self.signals.write().await;
        let row = signals.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        patch.apply_to(row);
        Ok(())
    }

    async fn mark_expired_inactive(
        &self,
        now: DateTime<Utc>,
        hours_threshold: i64,
    ) -> Result<usize, StoreError> {
        let stale_before = if hours_threshold > 0 {
            Some(window_start(now, hours_threshold)?)
        } else {
            None
        };
        let mut signals = self.signals.write().await;
        let mut deactivated = 0;
        for signal in signals.values_mut().filter(|s| s.is_active) {
            let expired = signal.is_expired_at(now);
            let stale = stale_before.is_some_and(|before| signal.last_detected_at < before);
            if expired || stale {
                signal.is_active = false;
                deactivated += 1;
            }
        }
        Ok(deactivated)
    }

    async fn list_signals(&self, active_only: bool) -> Result<Vec<Signal>, StoreError> {
        Ok(self
            .snapshot()
            .await
            .into_iter()
            .filter(|s| !active_only || s.is_active)
            .collect())
    }
}
