//! Multi-leg spread matching
//!
//! Looks for pairs of flagged contracts on the same ticker that were likely
//! traded together as one vertical or calendar spread. This stage only
//! annotates: it never removes or reorders detections, so its false-positive
//! rate can be observed before anyone filters on it.

use super::types::{SpreadAnalysis, SpreadIndicator, SpreadType, MAX_SPREAD_CONFIDENCE};
use crate::chain::{Contract, OptionType};
use crate::decimal::count_ratio;
use crate::detect::Detection;
use crate::telemetry::{increment_labeled, CounterMetric};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// Inclusive ratio band
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RatioBand {
    pub low: Decimal,
    pub high: Decimal,
}

impl RatioBand {
    pub const fn new(low: Decimal, high: Decimal) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, value: Decimal) -> bool {
        value >= self.low && value <= self.high
    }
}

/// Spread matching weights and bounds
///
/// The constants are hand-tuned, not backtested.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpreadConfig {
    /// Widest vertical considered, in strike dollars
    pub max_vertical_width: Decimal,
    pub calendar_min_days: i64,
    pub calendar_max_days: i64,

    pub volume_weight: Decimal,
    pub volume_tight: RatioBand,
    pub volume_loose: RatioBand,

    pub oi_weight: Decimal,
    pub oi_tight: RatioBand,
    pub oi_loose: RatioBand,

    pub strike_weight: Decimal,
    pub strike_tight: Decimal,
    pub strike_loose: Decimal,

    pub time_weight: Decimal,
    pub time_tight_secs: i64,
    pub time_loose_secs: i64,

    pub iv_weight: Decimal,
    pub iv_max_diff: Decimal,

    /// Indicators that must fire before a pair counts at all
    pub min_indicators: usize,
    pub confidence_cap: Decimal,
    pub likely_threshold: Decimal,
    pub possible_threshold: Decimal,
}

impl Default for SpreadConfig {
    fn default() -> Self {
        Self {
            max_vertical_width: dec!(50),
            calendar_min_days: 7,
            calendar_max_days: 90,

            volume_weight: dec!(0.40),
            volume_tight: RatioBand::new(dec!(0.80), dec!(1.25)),
            volume_loose: RatioBand::new(dec!(0.60), dec!(1.60)),

            oi_weight: dec!(0.30),
            oi_tight: RatioBand::new(dec!(0.70), dec!(1.40)),
            oi_loose: RatioBand::new(dec!(0.50), dec!(2.00)),

            strike_weight: dec!(0.15),
            strike_tight: dec!(10),
            strike_loose: dec!(25),

            time_weight: dec!(0.10),
            time_tight_secs: 5 * 60,
            time_loose_secs: 30 * 60,

            iv_weight: dec!(0.05),
            iv_max_diff: dec!(0.05),

            min_indicators: 3,
            confidence_cap: MAX_SPREAD_CONFIDENCE,
            likely_threshold: dec!(0.80),
            possible_threshold: dec!(0.60),
        }
    }
}

/// How two legs relate structurally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LegRelation {
    Vertical,
    Calendar,
}

/// One indicator that cleared its floor
#[derive(Debug, Clone)]
struct IndicatorHit {
    indicator: SpreadIndicator,
    weight: Decimal,
    detail: String,
}

/// Scored candidate pairing
#[derive(Debug, Clone)]
struct PairScore<'a> {
    other: &'a Contract,
    relation: LegRelation,
    confidence: Decimal,
    hits: Vec<IndicatorHit>,
}

/// Finds and scores spread candidates among a ticker's detections
#[derive(Debug, Clone)]
pub struct SpreadMatcher {
    config: SpreadConfig,
}

impl SpreadMatcher {
    pub fn new(config: SpreadConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(SpreadConfig::default())
    }

    pub fn config(&self) -> &SpreadConfig {
        &self.config
    }

    /// Best spread analysis per flagged contract symbol
    pub fn analyze(&self, detections: &[Detection]) -> HashMap<String, SpreadAnalysis> {
        // One entry per contract; the first detection carries the contract snapshot
        let mut contracts: BTreeMap<&str, &Detection> = BTreeMap::new();
        for detection in detections {
            contracts.entry(detection.symbol()).or_insert(detection);
        }

        let mut analyses = HashMap::with_capacity(contracts.len());
        for (symbol, primary) in &contracts {
            let best = contracts
                .iter()
                .filter(|(other_symbol, _)| *other_symbol != symbol)
                .filter_map(|(_, other)| self.score_pair(primary, other))
                .max_by(|a, b| {
                    a.confidence
                        .cmp(&b.confidence)
                        .then_with(|| b.other.symbol.cmp(&a.other.symbol))
                });

            let analysis = match best {
                Some(pair) if pair.confidence >= self.config.possible_threshold => {
                    self.build_analysis(&primary.contract, &pair)
                }
                _ => SpreadAnalysis::none(),
            };
            analyses.insert(symbol.to_string(), analysis);
        }

        analyses
    }

    /// Attach each contract's analysis to all of its detections
    pub fn annotate(&self, detections: &mut [Detection]) {
        let analyses = self.analyze(detections);
        for analysis in analyses.values() {
            let tier = match analysis.spread_type {
                SpreadType::None => "none",
                SpreadType::PossibleSpread => "possible",
                _ => "likely",
            };
            increment_labeled(CounterMetric::SpreadAnnotations, tier, 1);
        }

        for detection in detections.iter_mut() {
            if let Some(analysis) = analyses.get(detection.symbol()) {
                detection.spread = Some(analysis.clone());
            }
        }
    }

    fn relation(&self, a: &Contract, b: &Contract) -> Option<LegRelation> {
        if !a.ticker.eq_ignore_ascii_case(&b.ticker) || a.option_type != b.option_type {
            return None;
        }

        if a.expiry == b.expiry {
            let width = (a.strike - b.strike).abs();
            if width > Decimal::ZERO && width <= self.config.max_vertical_width {
                return Some(LegRelation::Vertical);
            }
            return None;
        }

        if a.strike == b.strike {
            let gap = (a.expiry - b.expiry).num_days().abs();
            if gap >= self.config.calendar_min_days && gap <= self.config.calendar_max_days {
                return Some(LegRelation::Calendar);
            }
        }

        None
    }

    fn score_pair<'a>(&self, primary: &Detection, other: &'a Detection) -> Option<PairScore<'a>> {
        let a = &primary.contract;
        let b = &other.contract;
        let relation = self.relation(a, b)?;

        let mut hits = Vec::new();
        let half = dec!(0.5);

        if let Some(volume_ratio) = count_ratio(a.volume, b.volume) {
            let weight = if self.config.volume_tight.contains(volume_ratio) {
                Some((self.config.volume_weight, "tight"))
            } else if self.config.volume_loose.contains(volume_ratio) {
                Some((self.config.volume_weight * half, "loose"))
            } else {
                None
            };
            if let Some((weight, strength)) = weight {
                hits.push(IndicatorHit {
                    indicator: SpreadIndicator::VolumeRatio,
                    weight,
                    detail: format!("volume ratio {} ({})", volume_ratio.round_dp(2), strength),
                });
            }
        }

        if let Some(oi_ratio) = count_ratio(a.open_interest, b.open_interest) {
            let weight = if self.config.oi_tight.contains(oi_ratio) {
                Some((self.config.oi_weight, "tight"))
            } else if self.config.oi_loose.contains(oi_ratio) {
                Some((self.config.oi_weight * half, "loose"))
            } else {
                None
            };
            if let Some((weight, strength)) = weight {
                hits.push(IndicatorHit {
                    indicator: SpreadIndicator::OpenInterestRatio,
                    weight,
                    detail: format!("OI ratio {} ({})", oi_ratio.round_dp(2), strength),
                });
            }
        }

        let width = (a.strike - b.strike).abs();
        let strike_weight = if width <= self.config.strike_tight {
            Some(self.config.strike_weight)
        } else if width <= self.config.strike_loose {
            Some(self.config.strike_weight * half)
        } else {
            None
        };
        if let Some(weight) = strike_weight {
            hits.push(IndicatorHit {
                indicator: SpreadIndicator::StrikeDistance,
                weight,
                detail: format!("strike width ${}", width.normalize()),
            });
        }

        let gap_secs = (primary.timestamp - other.timestamp).num_seconds().abs();
        let time_weight = if gap_secs < self.config.time_tight_secs {
            Some(self.config.time_weight)
        } else if gap_secs < self.config.time_loose_secs {
            Some(self.config.time_weight * half)
        } else {
            None
        };
        if let Some(weight) = time_weight {
            hits.push(IndicatorHit {
                indicator: SpreadIndicator::TimeProximity,
                weight,
                detail: format!("detected {}s apart", gap_secs),
            });
        }

        if let (Some(iv_a), Some(iv_b)) = (a.implied_volatility, b.implied_volatility) {
            let diff = (iv_a - iv_b).abs();
            if diff < self.config.iv_max_diff {
                hits.push(IndicatorHit {
                    indicator: SpreadIndicator::ImpliedVolatility,
                    weight: self.config.iv_weight,
                    detail: format!("IV within {}", diff.round_dp(3)),
                });
            }
        }

        if hits.len() < self.config.min_indicators {
            tracing::debug!(
                symbol = %a.symbol,
                other = %b.symbol,
                indicators = hits.len(),
                "Spread candidate rejected: too few indicators"
            );
            return None;
        }

        let total: Decimal = hits.iter().map(|h| h.weight).sum();
        let confidence =
            SpreadAnalysis::bounded_confidence(total.min(self.config.confidence_cap));

        Some(PairScore {
            other: b,
            relation,
            confidence,
            hits,
        })
    }

    fn build_analysis(&self, primary: &Contract, pair: &PairScore<'_>) -> SpreadAnalysis {
        let is_likely = pair.confidence >= self.config.likely_threshold;
        let spread_type = match (is_likely, pair.relation, primary.option_type) {
            (false, _, _) => SpreadType::PossibleSpread,
            (true, LegRelation::Vertical, OptionType::Call) => SpreadType::VerticalCall,
            (true, LegRelation::Vertical, OptionType::Put) => SpreadType::VerticalPut,
            (true, LegRelation::Calendar, _) => SpreadType::Calendar,
        };

        let shared_volume = Decimal::from(primary.volume.min(pair.other.volume));
        let net_premium = (primary.last_price - pair.other.last_price) * shared_volume * dec!(100);
        let relation_label = match pair.relation {
            LegRelation::Vertical => "vertical",
            LegRelation::Calendar => "calendar",
        };
        let details: Vec<&str> = pair.hits.iter().map(|h| h.detail.as_str()).collect();
        let reasoning = format!(
            "{} {} candidate with {} (confidence {}): {}",
            if is_likely { "likely" } else { "possible" },
            relation_label,
            pair.other.symbol,
            pair.confidence.round_dp(2),
            details.join(", ")
        );

        tracing::debug!(
            symbol = %primary.symbol,
            other = %pair.other.symbol,
            confidence = %pair.confidence,
            spread_type = %spread_type,
            "Spread candidate matched"
        );

        SpreadAnalysis {
            is_likely_spread: is_likely,
            confidence: pair.confidence,
            spread_type,
            matched_contract_symbols: vec![pair.other.symbol.clone()],
            strike_width: Some((primary.strike - pair.other.strike).abs()),
            estimated_net_premium: Some(net_premium),
            reasoning,
            indicators: pair.hits.iter().map(|h| h.indicator).collect(),
        }
    }
}

impl Default for SpreadMatcher {
    fn default() -> Self {
        Self::with_defaults()
    }
}
