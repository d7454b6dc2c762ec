//! Configuration types for unusual-flow
//!
//! Every section is optional; a missing section or key takes the default.

use crate::continuity::ContinuityConfig;
use crate::data::DataConfig;
use crate::detect::DetectorConfig;
use crate::provider::{CacheConfig, ProviderConfig};
use crate::scan::ScanConfig;
use crate::signal::{FilterConfig, GradingConfig};
use crate::spread::SpreadConfig;
use crate::store::MAX_WINDOW_HOURS;
use crate::telemetry::LogFormat;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default watchlist when no tickers are given on the command line
    pub tickers: Vec<String>,
    pub detector: DetectorConfig,
    pub spread: SpreadConfig,
    pub grading: GradingConfig,
    pub filter: FilterConfig,
    pub scan: ScanConfig,
    pub continuity: ContinuityConfig,
    pub provider: ProviderConfig,
    pub cache: CacheConfig,
    pub store: StoreConfig,
    pub data: DataConfig,
    pub telemetry: TelemetryConfig,
}

/// Signal store configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON file holding persisted signals
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./signals.json"),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
    /// Prometheus scrape port; no endpoint when unset
    pub metrics_port: Option<u16>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load an explicit path, else `config.toml` if present, else defaults
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::load(DEFAULT_CONFIG_PATH),
            None => Ok(Self::default()),
        }
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.scan.concurrency == 0 {
            anyhow::bail!("scan.concurrency must be at least 1");
        }
        if self.scan.batch_size == 0 {
            anyhow::bail!("scan.batch_size must be at least 1");
        }
        if self.scan.per_ticker_cap == 0 {
            anyhow::bail!("scan.per_ticker_cap must be at least 1");
        }
        if !(1..=MAX_WINDOW_HOURS).contains(&self.continuity.lookback_hours) {
            anyhow::bail!(
                "continuity.lookback_hours must be between 1 and {}",
                MAX_WINDOW_HOURS
            );
        }
        if !(0..=MAX_WINDOW_HOURS).contains(&self.continuity.stale_hours) {
            anyhow::bail!(
                "continuity.stale_hours must be between 0 and {}",
                MAX_WINDOW_HOURS
            );
        }
        let weights = &self.grading.weights;
        let all = [
            weights.volume,
            weights.premium,
            weights.open_interest,
            weights.tight_spread,
            weights.put_call_ratio,
        ];
        if all.iter().any(|w| *w < Decimal::ZERO) {
            anyhow::bail!("grading weights must be non-negative");
        }
        if self.spread.confidence_cap > crate::spread::MAX_SPREAD_CONFIDENCE {
            anyhow::bail!(
                "spread.confidence_cap must not exceed {}",
                crate::spread::MAX_SPREAD_CONFIDENCE
            );
        }
        Ok(())
    }
}
