//! Provider types

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Chain provider errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Upstream throttled the request
    #[error("Rate limited")]
    RateLimited,

    /// No data for this ticker
    #[error("Not available")]
    NotAvailable,

    /// Network or upstream failure that may succeed on retry
    #[error("Transient failure: {0}")]
    Transient(String),

    /// Request did not complete in time
    #[error("Timed out")]
    Timeout,

    /// Response arrived but could not be decoded
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Worth retrying at the provider boundary
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited | ProviderError::Transient(_) | ProviderError::Timeout
        )
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else if e.is_decode() {
            ProviderError::Malformed(e.to_string())
        } else {
            ProviderError::Transient(e.to_string())
        }
    }
}

/// Provider configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// HTTP API base URL
    pub base_url: Option<String>,
    /// Bearer token for the HTTP API
    pub api_key: Option<String>,
    /// Directory of `<TICKER>.chain.json` snapshots for offline runs
    pub data_dir: Option<PathBuf>,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            data_dir: None,
            timeout_secs: 10,
            max_retries: 3,
            backoff_base_ms: 500,
            backoff_max_ms: 8_000,
        }
    }
}

/// Exponential backoff: base * 2^(attempt-1), capped
pub fn backoff_delay(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let exponent = attempt.saturating_sub(1).min(10);
    let delay = base_ms.saturating_mul(1u64 << exponent);
    Duration::from_millis(delay.min(max_ms))
}
