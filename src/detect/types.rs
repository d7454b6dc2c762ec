//! Detection types

use crate::chain::{Contract, ContractError, OptionType};
use crate::decimal::clamp;
use crate::spread::SpreadAnalysis;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of anomaly found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionKind {
    /// Volume far above the contract's average
    VolumeAnomaly,
    /// Open interest jumped versus the previous session
    OiSpike,
    /// Large dollar premium spent on the contract
    PremiumFlow,
    /// Unusually tight bid-ask on heavy volume
    TightSpread,
    /// Extreme chain-wide put/call volume skew
    PutCallRatio,
}

impl DetectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionKind::VolumeAnomaly => "volume_anomaly",
            DetectionKind::OiSpike => "oi_spike",
            DetectionKind::PremiumFlow => "premium_flow",
            DetectionKind::TightSpread => "tight_spread",
            DetectionKind::PutCallRatio => "put_call_ratio",
        }
    }
}

impl std::fmt::Display for DetectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directional read of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

impl From<OptionType> for Sentiment {
    fn from(option_type: OptionType) -> Self {
        match option_type {
            OptionType::Call => Sentiment::Bullish,
            OptionType::Put => Sentiment::Bearish,
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sentiment::Bullish => write!(f, "bullish"),
            Sentiment::Bearish => write!(f, "bearish"),
            Sentiment::Neutral => write!(f, "neutral"),
        }
    }
}

/// One anomaly finding against one contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub kind: DetectionKind,
    /// Triggering contract (representative contract for chain-level findings)
    pub contract: Contract,
    /// Named numeric facts behind the finding
    pub metrics: BTreeMap<String, Decimal>,
    /// Confidence in [0, 1]
    pub confidence: Decimal,
    pub sentiment: Sentiment,
    /// Produced without true history
    pub is_heuristic: bool,
    pub timestamp: DateTime<Utc>,
    /// Multi-leg annotation, attached by the spread matcher
    #[serde(default)]
    pub spread: Option<SpreadAnalysis>,
}

impl Detection {
    /// Create a detection; confidence is clamped into [0, 1]
    pub fn new(kind: DetectionKind, contract: &Contract, confidence: Decimal) -> Self {
        Self {
            kind,
            sentiment: contract.option_type.into(),
            timestamp: contract.snapshot_time,
            contract: contract.clone(),
            metrics: BTreeMap::new(),
            confidence: clamp(confidence, Decimal::ZERO, Decimal::ONE),
            is_heuristic: false,
            spread: None,
        }
    }

    pub fn with_metric(mut self, name: &str, value: Decimal) -> Self {
        self.metrics.insert(name.to_string(), value);
        self
    }

    pub fn with_sentiment(mut self, sentiment: Sentiment) -> Self {
        self.sentiment = sentiment;
        self
    }

    pub fn heuristic(mut self) -> Self {
        self.is_heuristic = true;
        self
    }

    pub fn metric(&self, name: &str) -> Option<Decimal> {
        self.metrics.get(name).copied()
    }

    pub fn symbol(&self) -> &str {
        &self.contract.symbol
    }
}

/// Why a contract never reached the checks
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    Invalid(ContractError),
    TooCloseToExpiry(i64),
    LowVolume(u64),
    StrikeOutOfBand(Decimal),
    NoUnderlyingPrice,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Invalid(e) => write!(f, "Invalid contract: {}", e),
            SkipReason::TooCloseToExpiry(dte) => write!(f, "Too close to expiry: {} days", dte),
            SkipReason::LowVolume(v) => write!(f, "Volume below minimum: {}", v),
            SkipReason::StrikeOutOfBand(pct) => write!(f, "Strike too far from spot: {}", pct),
            SkipReason::NoUnderlyingPrice => write!(f, "No underlying price"),
        }
    }
}
