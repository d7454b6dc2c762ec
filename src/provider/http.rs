//! HTTP chain provider
//!
//! `GET {base}/chains/{ticker}` returns a [`Chain`] and
//! `GET {base}/baselines/{ticker}` a [`HistoricalBaseline`], both as JSON.

use super::types::backoff_delay;
use super::{ChainProvider, ProviderConfig, ProviderError};
use crate::chain::{Chain, HistoricalBaseline};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Provider backed by a JSON HTTP API
pub struct HttpChainProvider {
    base_url: String,
    api_key: Option<String>,
    max_retries: u32,
    backoff_base_ms: u64,
    backoff_max_ms: u64,
    client: Client,
}

impl HttpChainProvider {
    /// Create a client against `base_url`
    pub fn new(base_url: impl Into<String>, config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ProviderError::Transient(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
            backoff_base_ms: config.backoff_base_ms,
            backoff_max_ms: config.backoff_max_ms,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn chain_url(&self, ticker: &str) -> String {
        format!("{}/chains/{}", self.base_url, ticker.to_ascii_uppercase())
    }

    fn baseline_url(&self, ticker: &str) -> String {
        format!("{}/baselines/{}", self.base_url, ticker.to_ascii_uppercase())
    }

    /// One request; `Ok(None)` on 404
    async fn fetch_once<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>, ProviderError> {
        let mut request = self.client.get(url);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if status.is_server_error() {
            return Err(ProviderError::Transient(format!("upstream status {}", status)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Malformed(format!("status {}: {}", status, body)));
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| ProviderError::Malformed(e.to_string()))
    }

    /// Retry retryable failures with exponential backoff; the last error wins
    async fn fetch_with_retry<T: DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<Option<T>, ProviderError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(url).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = backoff_delay(attempt, self.backoff_base_ms, self.backoff_max_ms);
                    warn!(
                        url = %url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Provider request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl ChainProvider for HttpChainProvider {
    async fn get_options_chain(&self, ticker: &str) -> Result<Chain, ProviderError> {
        let url = self.chain_url(ticker);
        debug!(url = %url, "Fetching options chain");
        self.fetch_with_retry(&url)
            .await?
            .ok_or(ProviderError::NotAvailable)
    }

    async fn get_historical_baseline(
        &self,
        ticker: &str,
    ) -> Result<Option<HistoricalBaseline>, ProviderError> {
        let url = self.baseline_url(ticker);
        debug!(url = %url, "Fetching historical baseline");
        self.fetch_with_retry(&url).await
    }
}
