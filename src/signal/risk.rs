//! Risk tagging for graded signals

use super::types::{Moneyness, RiskFactor, RiskLevel};
use crate::chain::Contract;
use crate::decimal::count_ratio;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::BTreeSet;

/// Risk thresholds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Days to expiry at or below which a contract is short-dated
    pub short_expiry_days: i64,
    /// Fraction out of the money that counts as far
    pub far_otm_pct: Decimal,
    /// Fraction out of the money that counts as extreme
    pub extreme_otm_pct: Decimal,
    /// Volume over open interest above this is churn
    pub high_volume_oi_ratio: Decimal,
    /// Premium below this is small-ticket flow
    pub retail_premium: Decimal,
    /// Implied vol below this is treated as a stale quote
    pub stale_iv: Decimal,
    pub medium_tag_count: usize,
    pub high_tag_count: usize,
    pub medium_penalty: Decimal,
    pub high_penalty: Decimal,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            short_expiry_days: 7,
            far_otm_pct: dec!(0.10),
            extreme_otm_pct: dec!(0.25),
            high_volume_oi_ratio: dec!(2.0),
            retail_premium: dec!(250_000),
            stale_iv: dec!(0.10),
            medium_tag_count: 2,
            high_tag_count: 4,
            medium_penalty: dec!(0.03),
            high_penalty: dec!(0.05),
        }
    }
}

/// Outcome of tagging one contract
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    pub factors: BTreeSet<RiskFactor>,
    pub level: RiskLevel,
    /// Sum of tag penalties plus the level penalty
    pub penalty: Decimal,
}

/// Tag a contract and derive its risk level and score penalty
pub fn assess(
    config: &RiskConfig,
    contract: &Contract,
    underlying_price: Decimal,
    moneyness: Moneyness,
) -> RiskAssessment {
    let mut factors = BTreeSet::new();
    let dte = contract.days_to_expiry();
    let otm = contract.otm_pct(underlying_price);

    if dte <= config.short_expiry_days {
        factors.insert(RiskFactor::ShortExpiry);
        if moneyness == Moneyness::Otm {
            factors.insert(RiskFactor::ShortExpiryOtm);
        }
    }
    if otm > config.far_otm_pct {
        factors.insert(RiskFactor::FarOutOfTheMoney);
    }
    if otm > config.extreme_otm_pct {
        factors.insert(RiskFactor::ExtremelyOutOfTheMoney);
    }
    let churn = match count_ratio(contract.volume, contract.open_interest) {
        Some(ratio) => ratio > config.high_volume_oi_ratio,
        None => contract.volume > 0,
    };
    if churn {
        factors.insert(RiskFactor::HighVolumeToOi);
    }
    if contract.premium() < config.retail_premium {
        factors.insert(RiskFactor::RetailNoise);
    }
    if let Some(iv) = contract.implied_volatility {
        if iv < config.stale_iv {
            factors.insert(RiskFactor::StaleImpliedVol);
        }
    }

    let level = if factors.iter().any(RiskFactor::is_severe) || factors.len() >= config.high_tag_count
    {
        RiskLevel::High
    } else if factors.len() >= config.medium_tag_count {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    let level_penalty = match level {
        RiskLevel::Low => Decimal::ZERO,
        RiskLevel::Medium => config.medium_penalty,
        RiskLevel::High => config.high_penalty,
    };
    let penalty = factors.iter().map(RiskFactor::penalty).sum::<Decimal>() + level_penalty;

    RiskAssessment {
        factors,
        level,
        penalty,
    }
}
