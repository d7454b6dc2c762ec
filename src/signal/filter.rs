//! Signal filtering

use super::types::{Grade, RiskLevel, Signal};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Result of applying filters to a signal
#[derive(Debug, Clone, PartialEq)]
pub enum FilterResult {
    /// Signal passed all filters
    Pass,
    /// Signal rejected
    Reject(RejectReason),
}

impl FilterResult {
    pub fn is_pass(&self) -> bool {
        matches!(self, FilterResult::Pass)
    }
}

/// Reason for signal rejection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Grade below the configured minimum
    GradeTooLow(Grade),
    /// Score below the absolute floor
    ScoreTooLow(Decimal),
    /// HIGH risk without enough score to carry it
    HighRiskLowScore(Decimal),
    /// Too many risk tags
    TooManyRiskFactors(usize),
    /// Premium too small to matter
    PremiumTooSmall(Decimal),
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::GradeTooLow(g) => write!(f, "grade {} below minimum", g),
            RejectReason::ScoreTooLow(s) => write!(f, "score {} below floor", s),
            RejectReason::HighRiskLowScore(s) => write!(f, "high risk with score {}", s),
            RejectReason::TooManyRiskFactors(n) => write!(f, "{} risk factors", n),
            RejectReason::PremiumTooSmall(p) => write!(f, "premium {} too small", p),
        }
    }
}

/// Configuration for signal filters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Minimum letter grade kept
    pub min_grade: Grade,
    /// Absolute score floor
    pub min_score: Decimal,
    /// HIGH-risk signals need at least this score
    pub high_risk_min_score: Decimal,
    /// Reject when risk factor count exceeds this
    pub max_risk_factors: usize,
    /// Minimum premium flow in dollars
    pub min_premium: Decimal,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_grade: Grade::C,
            min_score: dec!(0.15),
            high_risk_min_score: dec!(0.30),
            max_risk_factors: 4,
            min_premium: dec!(100_000),
        }
    }
}

/// Signal filter chain
pub struct SignalFilter {
    config: FilterConfig,
}

impl SignalFilter {
    /// Create a new signal filter with given configuration
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(FilterConfig::default())
    }

    /// Apply all filters to a signal
    pub fn apply(&self, signal: &Signal) -> FilterResult {
        if signal.overall_score < self.config.min_score {
            return FilterResult::Reject(RejectReason::ScoreTooLow(signal.overall_score));
        }

        if signal.grade < self.config.min_grade {
            return FilterResult::Reject(RejectReason::GradeTooLow(signal.grade));
        }

        if signal.risk_level == RiskLevel::High
            && signal.overall_score < self.config.high_risk_min_score
        {
            return FilterResult::Reject(RejectReason::HighRiskLowScore(signal.overall_score));
        }

        if signal.risk_factors.len() > self.config.max_risk_factors {
            return FilterResult::Reject(RejectReason::TooManyRiskFactors(
                signal.risk_factors.len(),
            ));
        }

        if signal.premium_flow < self.config.min_premium {
            return FilterResult::Reject(RejectReason::PremiumTooSmall(signal.premium_flow));
        }

        FilterResult::Pass
    }
}

impl Default for SignalFilter {
    fn default() -> Self {
        Self::with_defaults()
    }
}
