//! Signal types

use crate::chain::{Contract, OptionType};
use crate::decimal::clamp;
use crate::detect::Sentiment;
use crate::spread::{SpreadAnalysis, SpreadType};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Highest score any signal can carry
pub const MAX_SCORE: Decimal = dec!(0.95);

/// Letter grade, ordered F < D < C < B < A < S
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    F,
    D,
    C,
    B,
    A,
    S,
}

impl Grade {
    /// Fixed cutoffs; monotonic in `score`
    pub fn from_score(score: Decimal) -> Self {
        if score >= dec!(0.85) {
            Grade::S
        } else if score >= dec!(0.75) {
            Grade::A
        } else if score >= dec!(0.65) {
            Grade::B
        } else if score >= dec!(0.55) {
            Grade::C
        } else if score >= dec!(0.45) {
            Grade::D
        } else {
            Grade::F
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let letter = match self {
            Grade::S => "S",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        f.write_str(letter)
    }
}

/// Overall risk bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
        }
    }
}

/// Individual risk tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    ShortExpiry,
    FarOutOfTheMoney,
    ExtremelyOutOfTheMoney,
    HighVolumeToOi,
    RetailNoise,
    ShortExpiryOtm,
    StaleImpliedVol,
}

impl RiskFactor {
    /// Score deduction for carrying this tag
    pub fn penalty(&self) -> Decimal {
        match self {
            RiskFactor::ShortExpiry => dec!(0.10),
            RiskFactor::FarOutOfTheMoney => dec!(0.05),
            RiskFactor::ExtremelyOutOfTheMoney => dec!(0.20),
            RiskFactor::HighVolumeToOi => dec!(0.05),
            RiskFactor::RetailNoise => dec!(0.10),
            RiskFactor::ShortExpiryOtm => dec!(0.25),
            RiskFactor::StaleImpliedVol => dec!(0.05),
        }
    }

    /// A single severe tag makes the signal HIGH risk
    pub fn is_severe(&self) -> bool {
        matches!(
            self,
            RiskFactor::ExtremelyOutOfTheMoney | RiskFactor::ShortExpiryOtm
        )
    }
}

impl std::fmt::Display for RiskFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RiskFactor::ShortExpiry => "short_expiry",
            RiskFactor::FarOutOfTheMoney => "far_otm",
            RiskFactor::ExtremelyOutOfTheMoney => "extremely_otm",
            RiskFactor::HighVolumeToOi => "high_volume_to_oi",
            RiskFactor::RetailNoise => "retail_noise",
            RiskFactor::ShortExpiryOtm => "short_expiry_otm",
            RiskFactor::StaleImpliedVol => "stale_iv",
        };
        f.write_str(label)
    }
}

/// Strike relative to the underlying
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Moneyness {
    Itm,
    Atm,
    Otm,
}

impl Moneyness {
    /// Classify with a symmetric at-the-money band (fraction of spot)
    pub fn classify(
        option_type: OptionType,
        strike: Decimal,
        underlying_price: Decimal,
        atm_band: Decimal,
    ) -> Self {
        if underlying_price <= Decimal::ZERO {
            return Moneyness::Atm;
        }
        if (strike - underlying_price).abs() / underlying_price <= atm_band {
            return Moneyness::Atm;
        }
        let call_itm = strike < underlying_price;
        match (option_type, call_itm) {
            (OptionType::Call, true) | (OptionType::Put, false) => Moneyness::Itm,
            _ => Moneyness::Otm,
        }
    }
}

impl std::fmt::Display for Moneyness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Moneyness::Itm => write!(f, "ITM"),
            Moneyness::Atm => write!(f, "ATM"),
            Moneyness::Otm => write!(f, "OTM"),
        }
    }
}

/// Identity tuple; unique among active signals
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityKey {
    pub ticker: String,
    pub option_symbol: String,
    pub strike: Decimal,
    pub expiry: NaiveDate,
    pub option_type: OptionType,
}

impl std::fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}",
            self.ticker, self.option_symbol, self.strike, self.expiry, self.option_type
        )
    }
}

/// A graded unusual-activity signal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub id: Uuid,

    pub ticker: String,
    pub option_symbol: String,
    pub strike: Decimal,
    pub expiry: NaiveDate,
    pub option_type: OptionType,

    pub underlying_price: Decimal,
    pub last_price: Decimal,
    pub volume: u64,
    pub open_interest: u64,
    /// last x volume x 100
    pub premium_flow: Decimal,
    pub implied_volatility: Option<Decimal>,
    pub sentiment: Sentiment,
    pub moneyness: Moneyness,
    pub days_to_expiry: i64,

    pub has_volume_anomaly: bool,
    pub has_oi_spike: bool,
    pub has_premium_flow: bool,
    pub has_tight_spread: bool,
    pub has_put_call_skew: bool,
    /// Most contributing detections lacked true history
    pub is_heuristic: bool,

    /// In [0, 0.95]
    pub overall_score: Decimal,
    pub grade: Grade,
    pub confidence: Decimal,
    pub risk_level: RiskLevel,
    pub risk_factors: BTreeSet<RiskFactor>,

    pub is_likely_spread: bool,
    pub spread_confidence: Decimal,
    pub spread_type: SpreadType,
    pub matched_leg_symbols: Vec<String>,
    pub spread_strike_width: Option<Decimal>,
    pub spread_net_premium: Option<Decimal>,
    pub spread_reasoning: Option<String>,

    pub signal_group_id: Uuid,
    pub first_detected_at: DateTime<Utc>,
    pub last_detected_at: DateTime<Utc>,
    pub detection_count: u32,
    pub is_active: bool,
}

impl Signal {
    /// Fresh, ungraded signal carrying the contract's static fields
    pub fn from_contract(contract: &Contract, underlying_price: Decimal) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            ticker: contract.ticker.to_ascii_uppercase(),
            option_symbol: contract.symbol.clone(),
            strike: contract.strike,
            expiry: contract.expiry,
            option_type: contract.option_type,
            underlying_price,
            last_price: contract.last_price,
            volume: contract.volume,
            open_interest: contract.open_interest,
            premium_flow: contract.premium(),
            implied_volatility: contract.implied_volatility,
            sentiment: contract.option_type.into(),
            moneyness: Moneyness::classify(
                contract.option_type,
                contract.strike,
                underlying_price,
                dec!(0.02),
            ),
            days_to_expiry: contract.days_to_expiry(),
            has_volume_anomaly: false,
            has_oi_spike: false,
            has_premium_flow: false,
            has_tight_spread: false,
            has_put_call_skew: false,
            is_heuristic: false,
            overall_score: Decimal::ZERO,
            grade: Grade::F,
            confidence: Decimal::ZERO,
            risk_level: RiskLevel::Low,
            risk_factors: BTreeSet::new(),
            is_likely_spread: false,
            spread_confidence: Decimal::ZERO,
            spread_type: SpreadType::None,
            matched_leg_symbols: vec![],
            spread_strike_width: None,
            spread_net_premium: None,
            spread_reasoning: None,
            signal_group_id: id,
            first_detected_at: contract.snapshot_time,
            last_detected_at: contract.snapshot_time,
            detection_count: 1,
            is_active: true,
        }
    }

    /// Set the score (clamped) and the grade derived from it
    pub fn set_score(&mut self, score: Decimal) {
        self.overall_score = clamp(score, Decimal::ZERO, MAX_SCORE);
        self.grade = Grade::from_score(self.overall_score);
    }

    /// Copy a spread annotation onto the signal
    pub fn apply_spread(&mut self, analysis: &SpreadAnalysis) {
        self.is_likely_spread = analysis.is_likely_spread;
        self.spread_confidence = analysis.confidence;
        self.spread_type = analysis.spread_type;
        self.matched_leg_symbols = analysis.matched_contract_symbols.clone();
        self.spread_strike_width = analysis.strike_width;
        self.spread_net_premium = analysis.estimated_net_premium;
        self.spread_reasoning = analysis.is_match().then(|| analysis.reasoning.clone());
    }

    pub fn identity(&self) -> IdentityKey {
        IdentityKey {
            ticker: self.ticker.clone(),
            option_symbol: self.option_symbol.clone(),
            strike: self.strike,
            expiry: self.expiry,
            option_type: self.option_type,
        }
    }

    /// Number of distinct detection kinds that fired
    pub fn detection_kind_count(&self) -> usize {
        [
            self.has_volume_anomaly,
            self.has_oi_spike,
            self.has_premium_flow,
            self.has_tight_spread,
            self.has_put_call_skew,
        ]
        .iter()
        .filter(|flag| **flag)
        .count()
    }

    /// True once the contract's expiry date is before `now`'s date
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry < now.date_naive()
    }
}
