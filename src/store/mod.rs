//! Signal persistence module
//!
//! The store seam the continuity tracker writes through

mod json;
mod memory;
mod types;

pub use json::JsonFileStore;
pub use memory::MemorySignalStore;
pub use types::{window_start, SignalPatch, StoreError, MAX_WINDOW_HOURS};

use crate::signal::{IdentityKey, Signal};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Trait for signal store implementations
#[async_trait]
pub trait SignalStore: Send + Sync {
    /// Most recent active signal with this identity last seen at or after `since`
    async fn find_active_signal(
        &self,
        key: &IdentityKey,
        since: DateTime<Utc>,
    ) -> Result<Option<Signal>, StoreError>;

    /// Insert a new row; fails if an active row with the same identity exists
    async fn insert_signal(&self, signal: &Signal) -> Result<Uuid, StoreError>;

    /// Apply a partial update to an existing row
    async fn update_signal(&self, id: Uuid, patch: SignalPatch) -> Result<(), StoreError>;

    /// Deactivate expired rows and, when `hours_threshold > 0`, rows not
    /// re-detected within that many hours. Returns the number deactivated.
    async fn mark_expired_inactive(
        &self,
        now: DateTime<Utc>,
        hours_threshold: i64,
    ) -> Result<usize, StoreError>;

    /// All rows, optionally only active ones
    async fn list_signals(&self, active_only: bool) -> Result<Vec<Signal>, StoreError>;
}
