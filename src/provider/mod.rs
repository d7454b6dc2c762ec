//! Chain provider module
//!
//! Options chains and volume/OI baselines from an external source

mod cache;
mod file;
mod http;
mod types;

pub use cache::{CacheConfig, CachedProvider, TtlCache};
pub use file::FileChainProvider;
pub use http::HttpChainProvider;
pub use types::{backoff_delay, ProviderConfig, ProviderError};

use crate::chain::{Chain, HistoricalBaseline};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for chain provider implementations
#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// Current options chain for a ticker
    async fn get_options_chain(&self, ticker: &str) -> Result<Chain, ProviderError>;

    /// Per-contract history; `None` when the provider has none
    async fn get_historical_baseline(
        &self,
        ticker: &str,
    ) -> Result<Option<HistoricalBaseline>, ProviderError>;
}

#[async_trait]
impl<P: ChainProvider + ?Sized> ChainProvider for Arc<P> {
    async fn get_options_chain(&self, ticker: &str) -> Result<Chain, ProviderError> {
        (**self).get_options_chain(ticker).await
    }

    async fn get_historical_baseline(
        &self,
        ticker: &str,
    ) -> Result<Option<HistoricalBaseline>, ProviderError> {
        (**self).get_historical_baseline(ticker).await
    }
}
