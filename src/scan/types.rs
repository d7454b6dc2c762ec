//! Scan types

use crate::continuity::ContinuityReport;
use crate::provider::ProviderError;
use crate::signal::Signal;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Orchestrator configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Tickers in flight at once
    pub concurrency: usize,
    /// Signals kept per ticker after ranking
    pub per_ticker_cap: usize,
    pub ticker_timeout_secs: u64,
    pub batch_size: usize,
    /// Rate-limited share of a batch above which the scanner cools down
    pub rate_limit_cooldown_fraction: Decimal,
    pub cooldown_secs: u64,
}

impl ScanConfig {
    pub fn ticker_timeout(&self) -> Duration {
        Duration::from_secs(self.ticker_timeout_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            per_ticker_cap: 3,
            ticker_timeout_secs: 30,
            batch_size: 50,
            rate_limit_cooldown_fraction: dec!(0.25),
            cooldown_secs: 60,
        }
    }
}

/// Scan errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Every ticker failed at the provider
    #[error("Provider outage: all {tickers} tickers failed")]
    ProviderOutage { tickers: usize },
}

/// Result of one chain through detect, spread, grade and filter
#[derive(Debug, Clone, Default)]
pub struct ChainAnalysis {
    /// Signals that passed the post-filter
    pub signals: Vec<Signal>,
    /// Signals graded before filtering
    pub graded: usize,
    pub filtered_out: usize,
}

/// How one ticker ended
#[derive(Debug)]
pub enum TickerOutcome {
    Analyzed(ChainAnalysis),
    RateLimited,
    Unavailable,
    Failed(ProviderError),
}

/// Batch counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub tickers_scanned: usize,
    pub tickers_with_signals: usize,
    pub rate_limited: usize,
    pub unavailable: usize,
    /// Transient, timeout or malformed
    pub failed: usize,
    pub graded: usize,
    pub filtered_out: usize,
    /// Signals that passed the post-filter
    pub candidates: usize,
    /// Dropped by the per-ticker cap
    pub capped: usize,
    pub kept: usize,
    pub cooldowns: usize,
}

impl ScanSummary {
    /// Tickers that ended in a provider error other than missing data
    pub fn provider_failures(&self) -> usize {
        self.rate_limited + self.failed
    }
}

/// Ranked signals plus counters
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub signals: Vec<Signal>,
    pub summary: ScanSummary,
}

/// One poll cycle: sweep, scan, continuity
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub scan: ScanReport,
    pub continuity: ContinuityReport,
    pub deactivated: usize,
    /// The stale sweep errored; the scan still ran
    pub sweep_failed: bool,
}
