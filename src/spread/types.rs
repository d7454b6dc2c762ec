//! Spread annotation types

use crate::decimal::clamp;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Upper bound on any spread confidence; leg data is delayed and partial
pub const MAX_SPREAD_CONFIDENCE: Decimal = dec!(0.90);

/// Multi-leg structure a contract appears to belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpreadType {
    VerticalCall,
    VerticalPut,
    Calendar,
    /// Exploratory tier, not authoritative
    PossibleSpread,
    None,
}

impl std::fmt::Display for SpreadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SpreadType::VerticalCall => "vertical_call",
            SpreadType::VerticalPut => "vertical_put",
            SpreadType::Calendar => "calendar",
            SpreadType::PossibleSpread => "possible_spread",
            SpreadType::None => "none",
        };
        f.write_str(label)
    }
}

/// Evidence that two legs were traded together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpreadIndicator {
    VolumeRatio,
    OpenInterestRatio,
    StrikeDistance,
    TimeProximity,
    ImpliedVolatility,
}

impl std::fmt::Display for SpreadIndicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SpreadIndicator::VolumeRatio => "volume ratio",
            SpreadIndicator::OpenInterestRatio => "OI ratio",
            SpreadIndicator::StrikeDistance => "strike distance",
            SpreadIndicator::TimeProximity => "time proximity",
            SpreadIndicator::ImpliedVolatility => "IV similarity",
        };
        f.write_str(label)
    }
}

/// Spread annotation attached to a detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadAnalysis {
    pub is_likely_spread: bool,
    /// In [0, 0.90]
    pub confidence: Decimal,
    pub spread_type: SpreadType,
    pub matched_contract_symbols: Vec<String>,
    pub strike_width: Option<Decimal>,
    pub estimated_net_premium: Option<Decimal>,
    pub reasoning: String,
    pub indicators: Vec<SpreadIndicator>,
}

impl SpreadAnalysis {
    /// No multi-leg match
    pub fn none() -> Self {
        Self {
            is_likely_spread: false,
            confidence: Decimal::ZERO,
            spread_type: SpreadType::None,
            matched_contract_symbols: vec![],
            strike_width: None,
            estimated_net_premium: None,
            reasoning: "no multi-leg match".to_string(),
            indicators: vec![],
        }
    }

    /// Clamp confidence into the allowed range
    pub fn bounded_confidence(confidence: Decimal) -> Decimal {
        clamp(confidence, Decimal::ZERO, MAX_SPREAD_CONFIDENCE)
    }

    pub fn is_match(&self) -> bool {
        self.spread_type != SpreadType::None
    }
}

impl Default for SpreadAnalysis {
    fn default() -> Self {
        Self::none()
    }
}
