//! Signal grading
//!
//! Folds the detections for one contract into a single scored [`Signal`].
//! Grading is a pure function of its inputs.

use super::risk::{assess, RiskConfig};
use super::types::{Moneyness, Signal};
use crate::decimal::{clamp, count_ratio, ratio};
use crate::detect::{Detection, DetectionKind};
use crate::telemetry::{increment_counter, CounterMetric};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Per-kind weights in the base score
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KindWeights {
    pub volume: Decimal,
    pub premium: Decimal,
    pub open_interest: Decimal,
    pub tight_spread: Decimal,
    pub put_call_ratio: Decimal,
}

impl KindWeights {
    pub fn weight(&self, kind: DetectionKind) -> Decimal {
        match kind {
            DetectionKind::VolumeAnomaly => self.volume,
            DetectionKind::PremiumFlow => self.premium,
            DetectionKind::OiSpike => self.open_interest,
            DetectionKind::TightSpread => self.tight_spread,
            DetectionKind::PutCallRatio => self.put_call_ratio,
        }
    }
}

impl Default for KindWeights {
    fn default() -> Self {
        Self {
            volume: dec!(0.35),
            premium: dec!(0.25),
            open_interest: dec!(0.20),
            tight_spread: dec!(0.10),
            put_call_ratio: dec!(0.10),
        }
    }
}

/// Grader configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GradingConfig {
    pub weights: KindWeights,
    /// Bonus for two distinct kinds
    pub bonus_two_kinds: Decimal,
    pub bonus_three_kinds: Decimal,
    /// Bonus for four or more kinds
    pub bonus_four_kinds: Decimal,
    /// Share of heuristic detections that triggers the penalty
    pub heuristic_share: Decimal,
    pub heuristic_penalty: Decimal,
    pub max_score: Decimal,
    /// Half-width of the at-the-money band, as a fraction of spot
    pub atm_band: Decimal,
    pub risk: RiskConfig,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            weights: KindWeights::default(),
            bonus_two_kinds: dec!(0.03),
            bonus_three_kinds: dec!(0.05),
            bonus_four_kinds: dec!(0.08),
            heuristic_share: dec!(0.70),
            heuristic_penalty: dec!(0.15),
            max_score: dec!(0.95),
            atm_band: dec!(0.02),
            risk: RiskConfig::default(),
        }
    }
}

/// Turns a contract's detections into a graded signal
pub struct SignalGrader {
    config: GradingConfig,
}

impl SignalGrader {
    pub fn new(config: GradingConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(GradingConfig::default())
    }

    pub fn config(&self) -> &GradingConfig {
        &self.config
    }

    /// Grade one contract's detections. Returns `None` for an empty slice.
    pub fn grade(
        &self,
        ticker: &str,
        underlying_price: Decimal,
        detections: &[Detection],
    ) -> Option<Signal> {
        let primary = primary_detection(detections)?;
        let mut signal = Signal::from_contract(&primary.contract, underlying_price);
        signal.ticker = ticker.to_ascii_uppercase();

        // Strongest confidence per kind
        let mut by_kind: BTreeMap<DetectionKind, Decimal> = BTreeMap::new();
        for detection in detections {
            let entry = by_kind.entry(detection.kind).or_insert(Decimal::ZERO);
            *entry = (*entry).max(detection.confidence);
        }

        let base = self.base_score(&by_kind);
        let bonus = self.combination_bonus(by_kind.len());
        let heuristic = self.is_mostly_heuristic(detections);
        let penalty = if heuristic {
            self.config.heuristic_penalty
        } else {
            Decimal::ZERO
        };
        let score = clamp(base + bonus - penalty, Decimal::ZERO, self.config.max_score);

        signal.has_volume_anomaly = by_kind.contains_key(&DetectionKind::VolumeAnomaly);
        signal.has_oi_spike = by_kind.contains_key(&DetectionKind::OiSpike);
        signal.has_premium_flow = by_kind.contains_key(&DetectionKind::PremiumFlow);
        signal.has_tight_spread = by_kind.contains_key(&DetectionKind::TightSpread);
        signal.has_put_call_skew = by_kind.contains_key(&DetectionKind::PutCallRatio);
        signal.is_heuristic = heuristic;
        signal.confidence = clamp(base, Decimal::ZERO, Decimal::ONE);

        if let Some(skew) = detections
            .iter()
            .find(|d| d.kind == DetectionKind::PutCallRatio)
        {
            signal.sentiment = skew.sentiment;
        }

        signal.moneyness = Moneyness::classify(
            primary.contract.option_type,
            primary.contract.strike,
            underlying_price,
            self.config.atm_band,
        );

        let risk = assess(
            &self.config.risk,
            &primary.contract,
            underlying_price,
            signal.moneyness,
        );
        let adjusted = clamp(score - risk.penalty, Decimal::ZERO, self.config.max_score);
        signal.risk_level = risk.level;
        signal.risk_factors = risk.factors;
        signal.set_score(adjusted);

        let spread = detections
            .iter()
            .find(|d| d.symbol() == primary.symbol() && d.spread.is_some())
            .and_then(|d| d.spread.as_ref());
        if let Some(analysis) = spread {
            signal.apply_spread(analysis);
        }

        increment_counter(CounterMetric::SignalsGraded, 1);
        debug!(
            ticker = %signal.ticker,
            symbol = %signal.option_symbol,
            base = %base,
            bonus = %bonus,
            risk_penalty = %risk.penalty,
            score = %signal.overall_score,
            grade = %signal.grade,
            risk = %signal.risk_level,
            "Graded signal"
        );

        Some(signal)
    }

    /// Weighted mean over the kinds present
    fn base_score(&self, by_kind: &BTreeMap<DetectionKind, Decimal>) -> Decimal {
        let (weighted, total_weight) = by_kind.iter().fold(
            (Decimal::ZERO, Decimal::ZERO),
            |(weighted, total), (kind, confidence)| {
                let weight = self.config.weights.weight(*kind);
                (weighted + confidence * weight, total + weight)
            },
        );
        ratio(weighted, total_weight).unwrap_or(Decimal::ZERO)
    }

    fn combination_bonus(&self, distinct_kinds: usize) -> Decimal {
        match distinct_kinds {
            0 | 1 => Decimal::ZERO,
            2 => self.config.bonus_two_kinds,
            3 => self.config.bonus_three_kinds,
            _ => self.config.bonus_four_kinds,
        }
    }

    fn is_mostly_heuristic(&self, detections: &[Detection]) -> bool {
        let heuristic = detections.iter().filter(|d| d.is_heuristic).count() as u64;
        count_ratio(heuristic, detections.len() as u64)
            .map(|share| share >= self.config.heuristic_share)
            .unwrap_or(false)
    }
}

impl Default for SignalGrader {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Highest confidence wins; ties go to the earlier kind, then the lower symbol
fn primary_detection(detections: &[Detection]) -> Option<&Detection> {
    detections.iter().min_by(|a, b| {
        b.confidence
            .cmp(&a.confidence)
            .then_with(|| a.kind.cmp(&b.kind))
            .then_with(|| a.symbol().cmp(b.symbol()))
    })
}
