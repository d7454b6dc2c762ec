//! Historical baseline for anomaly comparison

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-contract history, or the explicit absence of it
///
/// Detection functions match on this instead of null-checking, so the
/// heuristic path is always handled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Baseline {
    Known {
        average_volume: u64,
        previous_open_interest: u64,
    },
    Unknown,
}

impl Baseline {
    pub fn is_known(&self) -> bool {
        matches!(self, Baseline::Known { .. })
    }
}

/// Baselines for every contract of one ticker
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoricalBaseline {
    pub ticker: String,
    #[serde(default)]
    pub entries: HashMap<String, Baseline>,
}

impl HistoricalBaseline {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            entries: HashMap::new(),
        }
    }

    /// Record true history for a contract symbol
    pub fn insert(&mut self, symbol: impl Into<String>, average_volume: u64, previous_oi: u64) {
        self.entries.insert(
            symbol.into(),
            Baseline::Known {
                average_volume,
                previous_open_interest: previous_oi,
            },
        );
    }

    /// Baseline for a symbol, `Unknown` when the symbol has no history
    pub fn baseline_for(&self, symbol: &str) -> Baseline {
        self.entries.get(symbol).copied().unwrap_or(Baseline::Unknown)
    }
}
