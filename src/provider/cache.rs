//! TTL cache and caching provider wrapper

use super::{ChainProvider, ProviderError};
use crate::chain::{Chain, HistoricalBaseline};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Key to (value, expiry) map with explicit invalidation
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: RwLock<HashMap<K, (V, Instant)>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now()).await
    }

    /// Value if present and unexpired as of `now`
    pub async fn get_at(&self, key: &K, now: Instant) -> Option<V> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|(_, expires)| now < *expires)
            .map(|(value, _)| value.clone())
    }

    pub async fn insert(&self, key: K, value: V) {
        self.insert_at(key, value, Instant::now()).await
    }

    pub async fn insert_at(&self, key: K, value: V, now: Instant) {
        let mut entries = self.entries.write().await;
        entries.insert(key, (value, now + self.ttl));
    }

    pub async fn invalidate(&self, key: &K) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Drop expired entries; returns how many were removed
    pub async fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now()).await
    }

    pub async fn purge_expired_at(&self, now: Instant) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, (_, expires)| now < *expires);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Cache configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub chain_ttl_secs: u64,
    pub baseline_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chain_ttl_secs: 300,
            baseline_ttl_secs: 6 * 3600,
        }
    }
}

/// Provider wrapper caching successful responses. Errors are never cached.
pub struct CachedProvider<P> {
    inner: P,
    chains: TtlCache<String, Chain>,
    baselines: TtlCache<String, Option<HistoricalBaseline>>,
}

impl<P: ChainProvider> CachedProvider<P> {
    pub fn new(inner: P, config: &CacheConfig) -> Self {
        Self {
            inner,
            chains: TtlCache::new(Duration::from_secs(config.chain_ttl_secs)),
            baselines: TtlCache::new(Duration::from_secs(config.baseline_ttl_secs)),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Forget everything cached for a ticker
    pub async fn invalidate(&self, ticker: &str) {
        let key = ticker.to_ascii_uppercase();
        self.chains.invalidate(&key).await;
        self.baselines.invalidate(&key).await;
    }

    pub async fn purge_expired(&self) -> usize {
        self.chains.purge_expired().await + self.baselines.purge_expired().await
    }
}

#[async_trait]
impl<P: ChainProvider> ChainProvider for CachedProvider<P> {
    async fn get_options_chain(&self, ticker: &str) -> Result<Chain, ProviderError> {
        let key = ticker.to_ascii_uppercase();
        if let Some(chain) = self.chains.get(&key).await {
            debug!(ticker = %key, "Chain cache hit");
            return Ok(chain);
        }
        let chain = self.inner.get_options_chain(&key).await?;
        self.chains.insert(key, chain.clone()).await;
        Ok(chain)
    }

    async fn get_historical_baseline(
        &self,
        ticker: &str,
    ) -> Result<Option<HistoricalBaseline>, ProviderError> {
        let key = ticker.to_ascii_uppercase();
        if let Some(baseline) = self.baselines.get(&key).await {
            debug!(ticker = %key, "Baseline cache hit");
            return Ok(baseline);
        }
        let baseline = self.inner.get_historical_baseline(&key).await?;
        self.baselines.insert(key, baseline.clone()).await;
        Ok(baseline)
    }
}
