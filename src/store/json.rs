//! JSON-file signal store

use super::{MemorySignalStore, SignalPatch, SignalStore, StoreError};
use crate::signal::{IdentityKey, Signal};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

/// In-memory store persisted to a JSON file after every mutation
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemorySignalStore,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open a store, loading existing rows if the file exists
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let signals: Vec<Signal> = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => vec![],
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => vec![],
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), rows = signals.len(), "Opened signal store");

        Ok(Self {
            path,
            inner: MemorySignalStore::from_signals(signals),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the full snapshot; temp file then rename
    async fn persist(&self) -> Result<(), StoreError> {
        let rows = self.inner.snapshot().await;
        let bytes = serde_json::to_vec_pretty(&rows)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Persist, or put memory back to `before` so it never runs ahead of disk.
    /// Callers hold `write_lock`.
    async fn persist_or_rollback(&self, before: Vec<Signal>) -> Result<(), StoreError> {
        if let Err(e) = self.persist().await {
            warn!(path = %self.path.display(), error = %e, "Persist failed, rolling back");
            self.inner.restore(before).await;
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl SignalStore for JsonFileStore {
    async fn find_active_signal(
        &self,
        key: &IdentityKey,
        since: DateTime<Utc>,
    ) -> Result<Option<Signal>, StoreError> {
        self.inner.find_active_signal(key, since).await
    }

    async fn insert_signal(&self, signal: &Signal) -> Result<Uuid, StoreError> {
        let _guard = self.write_lock.lock().await;
        let before = self.inner.snapshot().await;
        let id = self.inner.insert_signal(signal).await?;
        self.persist_or_rollback(before).await?;
        Ok(id)
    }

    async fn update_signal(&self, id: Uuid, patch: SignalPatch) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let before = self.inner.snapshot().await;
        self.inner.update_signal(id, patch).await?;
        self.persist_or_rollback(before).await
    }

    async fn mark_expired_inactive(
        &self,
        now: DateTime<Utc>,
        hours_threshold: i64,
    ) -> Result<usize, StoreError> {
        let _guard = self.write_lock.lock().await;
        let before = self.inner.snapshot().await;
        let count = self.inner.mark_expired_inactive(now, hours_threshold).await?;
        if count > 0 {
            self.persist_or_rollback(before).await?;
        }
        Ok(count)
    }

    async fn list_signals(&self, active_only: bool) -> Result<Vec<Signal>, StoreError> {
        self.inner.list_signals(active_only).await
    }
}
