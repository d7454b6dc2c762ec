//! File-backed chain provider for offline runs

use super::{ChainProvider, ProviderError};
use crate::chain::{Chain, HistoricalBaseline};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads `<dir>/<TICKER>.chain.json` and `<dir>/<TICKER>.baseline.json`
pub struct FileChainProvider {
    dir: PathBuf,
}

impl FileChainProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Tickers with a chain file in the directory, sorted
    pub async fn available_tickers(&self) -> Result<Vec<String>, ProviderError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;
        let mut tickers = vec![];
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(ticker) = name.strip_suffix(".chain.json") {
                tickers.push(ticker.to_ascii_uppercase());
            }
        }
        tickers.sort();
        Ok(tickers)
    }

    async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>, ProviderError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ProviderError::Transient(e.to_string())),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| ProviderError::Malformed(format!("{}: {}", path.display(), e)))
    }
}

#[async_trait]
impl ChainProvider for FileChainProvider {
    async fn get_options_chain(&self, ticker: &str) -> Result<Chain, ProviderError> {
        let path = self
            .dir
            .join(format!("{}.chain.json", ticker.to_ascii_uppercase()));
        debug!(path = %path.display(), "Reading chain snapshot");
        self.read_json(&path).await?.ok_or(ProviderError::NotAvailable)
    }

    async fn get_historical_baseline(
        &self,
        ticker: &str,
    ) -> Result<Option<HistoricalBaseline>, ProviderError> {
        let path = self
            .dir
            .join(format!("{}.baseline.json", ticker.to_ascii_uppercase()));
        self.read_json(&path).await
    }
}
