//! Anomaly detection over a chain snapshot
//!
//! Each per-contract check is independent and yields at most one
//! detection. Confidence formulas are capped well below 1.0: the upstream
//! data is delayed and partial, so certainty is bounded.

use super::types::{Detection, DetectionKind, Sentiment, SkipReason};
use crate::chain::{Baseline, Chain, Contract, HistoricalBaseline, OptionType};
use crate::decimal::{clamp, count_ratio, ratio};
use crate::telemetry::{increment_labeled, CounterMetric};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::HashSet;

/// Thresholds for the anomaly checks
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Contracts closer than this to expiry are day-trading noise
    pub min_dte: i64,
    pub min_option_volume: u64,
    /// Max |strike - spot| / spot
    pub max_strike_distance_pct: Decimal,

    /// Current / average volume multiple that triggers
    pub volume_threshold: Decimal,
    /// Averages below this are too thin to trust
    pub min_average_volume: u64,
    pub volume_confidence_divisor: Decimal,
    pub volume_confidence_cap: Decimal,
    /// Absolute volume required without history
    pub heuristic_min_volume: u64,
    pub heuristic_volume_confidence_cap: Decimal,

    /// Fractional OI increase that triggers
    pub oi_change_threshold: Decimal,
    pub min_previous_oi: u64,
    pub oi_confidence_divisor: Decimal,
    pub oi_confidence_cap: Decimal,
    /// Absolute OI required without history
    pub heuristic_min_oi: u64,
    pub heuristic_oi_confidence_cap: Decimal,

    pub premium_threshold: Decimal,
    /// Threshold for tickers whose ordinary flow is already large
    pub high_volume_premium_threshold: Decimal,
    pub high_volume_tickers: HashSet<String>,
    pub premium_size_weight: Decimal,
    pub premium_aggressiveness_weight: Decimal,
    pub high_volume_penalty: Decimal,

    pub tight_spread_pct: Decimal,
    pub tight_spread_min_volume: u64,
    pub tight_spread_volume_scale: Decimal,
    pub tight_spread_confidence_cap: Decimal,

    pub pcr_bearish_threshold: Decimal,
    pub pcr_bullish_threshold: Decimal,
    pub pcr_min_total_volume: u64,
    pub pcr_base_confidence: Decimal,
    pub pcr_bearish_scale: Decimal,
    pub pcr_confidence_cap: Decimal,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_dte: 10,
            min_option_volume: 100,
            max_strike_distance_pct: dec!(0.30),

            volume_threshold: dec!(5.0),
            min_average_volume: 10,
            volume_confidence_divisor: dec!(15),
            volume_confidence_cap: dec!(0.9),
            heuristic_min_volume: 5_000,
            heuristic_volume_confidence_cap: dec!(0.8),

            oi_change_threshold: dec!(0.30),
            min_previous_oi: 100,
            oi_confidence_divisor: dec!(0.8),
            oi_confidence_cap: dec!(0.9),
            heuristic_min_oi: 10_000,
            heuristic_oi_confidence_cap: dec!(0.7),

            premium_threshold: dec!(1_000_000),
            high_volume_premium_threshold: dec!(5_000_000),
            high_volume_tickers: [
                "SPY", "QQQ", "IWM", "DIA", "AAPL", "TSLA", "NVDA", "AMZN", "MSFT", "META",
                "GOOGL", "AMD",
            ]
            .iter()
            .map(|t| t.to_string())
            .collect(),
            premium_size_weight: dec!(0.6),
            premium_aggressiveness_weight: dec!(0.4),
            high_volume_penalty: dec!(0.1),

            tight_spread_pct: dec!(0.015),
            tight_spread_min_volume: 1_000,
            tight_spread_volume_scale: dec!(10_000),
            tight_spread_confidence_cap: dec!(0.7),

            pcr_bearish_threshold: dec!(3.0),
            pcr_bullish_threshold: dec!(0.2),
            pcr_min_total_volume: 1_000,
            pcr_base_confidence: dec!(0.4),
            pcr_bearish_scale: dec!(5),
            pcr_confidence_cap: dec!(0.8),
        }
    }
}

/// Runs every anomaly check over a chain
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    config: DetectorConfig,
}

impl AnomalyDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(DetectorConfig::default())
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Detect anomalies in a chain
    ///
    /// A missing baseline means every contract takes the heuristic path.
    pub fn detect(&self, chain: &Chain, baseline: Option<&HistoricalBaseline>) -> Vec<Detection> {
        let candidates: Vec<&Contract> = chain
            .contracts
            .iter()
            .filter(|contract| match self.prefilter(contract, chain.underlying_price) {
                Ok(()) => true,
                Err(reason) => {
                    tracing::debug!(
                        ticker = %chain.ticker,
                        symbol = %contract.symbol,
                        reason = %reason,
                        "Contract skipped"
                    );
                    false
                }
            })
            .collect();

        let mut detections = Vec::new();
        for contract in &candidates {
            let history = baseline
                .map(|b| b.baseline_for(&contract.symbol))
                .unwrap_or(Baseline::Unknown);

            detections.extend(self.check_volume(contract, history));
            detections.extend(self.check_open_interest(contract, history));
            detections.extend(self.check_premium(&chain.ticker, contract));
            detections.extend(self.check_tight_spread(contract));
        }
        detections.extend(self.check_put_call_ratio(chain, &candidates));

        for detection in &detections {
            increment_labeled(CounterMetric::Detections, detection.kind.as_str(), 1);
        }

        tracing::debug!(
            ticker = %chain.ticker,
            contracts = chain.contracts.len(),
            candidates = candidates.len(),
            detections = detections.len(),
            "Chain analyzed"
        );

        detections
    }

    /// Hard gate applied before any check runs
    pub fn prefilter(&self, contract: &Contract, underlying_price: Decimal) -> Result<(), SkipReason> {
        contract.validate().map_err(SkipReason::Invalid)?;

        let dte = contract.days_to_expiry();
        if dte < self.config.min_dte {
            return Err(SkipReason::TooCloseToExpiry(dte));
        }

        if contract.volume < self.config.min_option_volume {
            return Err(SkipReason::LowVolume(contract.volume));
        }

        let distance = contract
            .strike_distance_pct(underlying_price)
            .ok_or(SkipReason::NoUnderlyingPrice)?;
        if distance > self.config.max_strike_distance_pct {
            return Err(SkipReason::StrikeOutOfBand(distance));
        }

        Ok(())
    }

    /// Volume versus its historical average
    pub fn check_volume(&self, contract: &Contract, baseline: Baseline) -> Option<Detection> {
        match baseline {
            Baseline::Known { average_volume, .. }
                if average_volume >= self.config.min_average_volume =>
            {
                let volume_ratio = count_ratio(contract.volume, average_volume)?;
                if volume_ratio < self.config.volume_threshold {
                    return None;
                }
                let confidence = ratio(volume_ratio, self.config.volume_confidence_divisor)?
                    .min(self.config.volume_confidence_cap);

                Some(
                    Detection::new(DetectionKind::VolumeAnomaly, contract, confidence)
                        .with_metric("volume", Decimal::from(contract.volume))
                        .with_metric("average_volume", Decimal::from(average_volume))
                        .with_metric("volume_ratio", volume_ratio),
                )
            }
            // Too little history to trust a ratio
            Baseline::Known { .. } | Baseline::Unknown => {
                if contract.volume < self.config.heuristic_min_volume {
                    return None;
                }
                let scale = Decimal::from(self.config.heuristic_min_volume) * dec!(3);
                let confidence = ratio(Decimal::from(contract.volume), scale)?
                    .min(self.config.heuristic_volume_confidence_cap);

                Some(
                    Detection::new(DetectionKind::VolumeAnomaly, contract, confidence)
                        .with_metric("volume", Decimal::from(contract.volume))
                        .with_metric(
                            "heuristic_min_volume",
                            Decimal::from(self.config.heuristic_min_volume),
                        )
                        .heuristic(),
                )
            }
        }
    }

    /// Open interest change versus the previous session
    pub fn check_open_interest(&self, contract: &Contract, baseline: Baseline) -> Option<Detection> {
        match baseline {
            Baseline::Known {
                previous_open_interest,
                ..
            } if previous_open_interest >= self.config.min_previous_oi => {
                let previous = Decimal::from(previous_open_interest);
                let change = ratio(Decimal::from(contract.open_interest) - previous, previous)?;
                if change < self.config.oi_change_threshold {
                    return None;
                }
                let confidence = ratio(change, self.config.oi_confidence_divisor)?
                    .min(self.config.oi_confidence_cap);

                Some(
                    Detection::new(DetectionKind::OiSpike, contract, confidence)
                        .with_metric("open_interest", Decimal::from(contract.open_interest))
                        .with_metric("previous_open_interest", previous)
                        .with_metric("oi_change_pct", change),
                )
            }
            Baseline::Known { .. } | Baseline::Unknown => {
                if contract.open_interest < self.config.heuristic_min_oi {
                    return None;
                }
                // Today's volume bounds how many positions could be new
                let estimated_change = count_ratio(contract.volume, contract.open_interest)?;
                if estimated_change < self.config.oi_change_threshold {
                    return None;
                }
                let confidence = ratio(estimated_change, self.config.oi_confidence_divisor)?
                    .min(self.config.heuristic_oi_confidence_cap);

                Some(
                    Detection::new(DetectionKind::OiSpike, contract, confidence)
                        .with_metric("open_interest", Decimal::from(contract.open_interest))
                        .with_metric("estimated_oi_change_pct", estimated_change)
                        .heuristic(),
                )
            }
        }
    }

    /// Dollar premium spent, scaled by how aggressively it was paid
    pub fn check_premium(&self, ticker: &str, contract: &Contract) -> Option<Detection> {
        let high_volume = self.is_high_volume_ticker(ticker);
        let threshold = if high_volume {
            self.config.high_volume_premium_threshold
        } else {
            self.config.premium_threshold
        };

        let premium = contract.premium();
        if premium < threshold {
            return None;
        }

        let size_score = ratio(premium, threshold)?.min(dec!(3)) / dec!(3);
        let aggressiveness = aggressiveness(contract);
        let mut confidence = self.config.premium_size_weight * size_score
            + self.config.premium_aggressiveness_weight * aggressiveness;
        if high_volume {
            confidence -= self.config.high_volume_penalty;
        }
        let confidence = clamp(confidence, dec!(0.1), dec!(0.9));

        Some(
            Detection::new(DetectionKind::PremiumFlow, contract, confidence)
                .with_metric("premium", premium)
                .with_metric("premium_threshold", threshold)
                .with_metric("aggressiveness", aggressiveness),
        )
    }

    /// Tight market on heavy volume, a hint of institutional execution
    pub fn check_tight_spread(&self, contract: &Contract) -> Option<Detection> {
        let spread_pct = contract.spread_pct()?;
        if spread_pct >= self.config.tight_spread_pct
            || contract.volume <= self.config.tight_spread_min_volume
        {
            return None;
        }

        let confidence = ratio(
            Decimal::from(contract.volume),
            self.config.tight_spread_volume_scale,
        )?
        .min(self.config.tight_spread_confidence_cap);

        Some(
            Detection::new(DetectionKind::TightSpread, contract, confidence)
                .with_metric("spread_pct", spread_pct)
                .with_metric("volume", Decimal::from(contract.volume)),
        )
    }

    /// Chain-level put/call volume skew, attached to a representative contract
    pub fn check_put_call_ratio(&self, chain: &Chain, candidates: &[&Contract]) -> Option<Detection> {
        let (call_volume, put_volume) = chain.volume_by_side();
        if call_volume + put_volume < self.config.pcr_min_total_volume {
            return None;
        }
        let put_call = count_ratio(put_volume, call_volume)?;

        let (sentiment, side, confidence) = if put_call > self.config.pcr_bearish_threshold {
            let excess = ratio(
                put_call - self.config.pcr_bearish_threshold,
                self.config.pcr_bearish_scale,
            )?;
            (Sentiment::Bearish, OptionType::Put, self.config.pcr_base_confidence + excess)
        } else if put_call < self.config.pcr_bullish_threshold {
            let shortfall = ratio(
                self.config.pcr_bullish_threshold - put_call,
                self.config.pcr_bullish_threshold,
            )?;
            (
                Sentiment::Bullish,
                OptionType::Call,
                self.config.pcr_base_confidence + shortfall * dec!(0.4),
            )
        } else {
            return None;
        };
        let confidence = confidence.min(self.config.pcr_confidence_cap);

        let representative = candidates
            .iter()
            .filter(|c| c.option_type == side)
            .max_by(|a, b| {
                a.volume
                    .cmp(&b.volume)
                    .then_with(|| b.symbol.cmp(&a.symbol))
            })?;

        tracing::debug!(
            ticker = %chain.ticker,
            put_call = %put_call,
            sentiment = %sentiment,
            "Extreme put/call ratio"
        );

        Some(
            Detection::new(DetectionKind::PutCallRatio, representative, confidence)
                .with_sentiment(sentiment)
                .with_metric("put_call_ratio", put_call)
                .with_metric("call_volume", Decimal::from(call_volume))
                .with_metric("put_volume", Decimal::from(put_volume)),
        )
    }

    pub fn is_high_volume_ticker(&self, ticker: &str) -> bool {
        self.config
            .high_volume_tickers
            .contains(&ticker.to_ascii_uppercase())
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Where the print sits inside the bid-ask band: 0 at bid, 1 at ask
fn aggressiveness(contract: &Contract) -> Decimal {
    let band = contract.ask - contract.bid;
    match ratio(contract.last_price - contract.bid, band) {
        Some(position) if band > Decimal::ZERO => clamp(position, Decimal::ZERO, Decimal::ONE),
        _ => dec!(0.5),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    fn snapshot_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 15, 0, 0).unwrap()
    }

    fn create_test_contract(symbol: &str, option_type: OptionType, volume: u64) -> Contract {
        Contract {
            symbol: symbol.to_string(),
            ticker: "XYZ".to_string(),
            strike: dec!(100),
            expiry: NaiveDate::from_ymd_opt(2026, 11, 20).unwrap(),
            option_type,
            last_price: dec!(2.00),
            bid: dec!(1.90),
            ask: dec!(2.10),
            volume,
            open_interest: 2_000,
            implied_volatility: Some(dec!(0.40)),
            greeks: None,
            snapshot_time: snapshot_time(),
        }
    }

    fn create_test_chain(ticker: &str, contracts: Vec<Contract>) -> Chain {
        Chain {
            ticker: ticker.to_string(),
            underlying_price: dec!(100),
            snapshot_time: snapshot_time(),
            contracts,
        }
    }

    fn known(average_volume: u64, previous_oi: u64) -> Baseline {
        Baseline::Known {
            average_volume,
            previous_open_interest: previous_oi,
        }
    }

    #[test]
    fn test_volume_anomaly_known_baseline() {
        let detector = AnomalyDetector::with_defaults();
        let contract = create_test_contract("C1", OptionType::Call, 6_000);

        let detection = detector
            .check_volume(&contract, known(1_000, 2_000))
            .unwrap();

        assert_eq!(detection.kind, DetectionKind::VolumeAnomaly);
        assert_eq!(detection.metric("volume_ratio"), Some(dec!(6)));
        assert_eq!(detection.confidence, dec!(0.4));
        assert!(!detection.is_heuristic);
    }

    #[test]
    fn test_volume_below_threshold() {
        let detector = AnomalyDetector::with_defaults();
        let contract = create_test_contract("C1", OptionType::Call, 4_000);
        assert!(detector.check_volume(&contract, known(1_000, 0)).is_none());
    }

    #[test]
    fn test_volume_confidence_capped() {
        let detector = AnomalyDetector::with_defaults();
        let contract = create_test_contract("C1", OptionType::Call, 30_000);
        let detection = detector.check_volume(&contract, known(1_000, 0)).unwrap();
        assert_eq!(detection.confidence, dec!(0.9));
    }

    #[test]
    fn test_volume_heuristic_path() {
        let detector = AnomalyDetector::with_defaults();

        let quiet = create_test_contract("C1", OptionType::Call, 4_999);
        assert!(detector.check_volume(&quiet, Baseline::Unknown).is_none());

        let loud = create_test_contract("C1", OptionType::Call, 60_000);
        let detection = detector.check_volume(&loud, Baseline::Unknown).unwrap();
        assert!(detection.is_heuristic);
        assert_eq!(detection.confidence, dec!(0.8));
    }

    #[test]
    fn test_volume_thin_history_falls_back_to_heuristic() {
        let detector = AnomalyDetector::with_defaults();
        let contract = create_test_contract("C1", OptionType::Call, 7_500);
        let detection = detector.check_volume(&contract, known(5, 0)).unwrap();
        assert!(detection.is_heuristic);
        assert_eq!(detection.confidence, dec!(0.5));
    }

    #[test]
    fn test_oi_spike_known_baseline() {
        let detector = AnomalyDetector::with_defaults();
        let mut contract = create_test_contract("C1", OptionType::Call, 500);
        contract.open_interest = 1_400;

        let detection = detector
            .check_open_interest(&contract, known(100, 1_000))
            .unwrap();
        assert_eq!(detection.metric("oi_change_pct"), Some(dec!(0.4)));
        assert_eq!(detection.confidence, dec!(0.5));
    }

    #[test]
    fn test_oi_below_threshold() {
        let detector = AnomalyDetector::with_defaults();
        let mut contract = create_test_contract("C1", OptionType::Call, 500);
        contract.open_interest = 1_200;
        assert!(detector
            .check_open_interest(&contract, known(100, 1_000))
            .is_none());
    }

    #[test]
    fn test_oi_heuristic_capped() {
        let detector = AnomalyDetector::with_defaults();
        let mut contract = create_test_contract("C1", OptionType::Call, 20_000);
        contract.open_interest = 10_000;

        let detection = detector
            .check_open_interest(&contract, Baseline::Unknown)
            .unwrap();
        assert!(detection.is_heuristic);
        assert_eq!(detection.confidence, dec!(0.7));

        contract.open_interest = 9_999;
        assert!(detector
            .check_open_interest(&contract, Baseline::Unknown)
            .is_none());
    }

    #[test]
    fn test_premium_threshold_by_ticker_class() {
        let detector = AnomalyDetector::with_defaults();
        // 15.00 x 3000 x 100 = $4.5M
        let mut contract = create_test_contract("C1", OptionType::Call, 3_000);
        contract.last_price = dec!(15.00);
        contract.bid = dec!(14.90);
        contract.ask = dec!(15.10);
        assert_eq!(contract.premium(), dec!(4_500_000));

        assert!(detector.check_premium("TSLA", &contract).is_none());
        assert!(detector.check_premium("tsla", &contract).is_none());

        let detection = detector.check_premium("XYZ", &contract).unwrap();
        assert_eq!(detection.kind, DetectionKind::PremiumFlow);
        // size 3/3 -> 0.6, aggressiveness 0.5 -> 0.2
        assert_eq!(detection.confidence, dec!(0.8));
    }

    #[test]
    fn test_premium_confidence_bounds() {
        let detector = AnomalyDetector::with_defaults();
        let mut contract = create_test_contract("C1", OptionType::Call, 5_000);
        contract.last_price = dec!(10.00);
        contract.bid = dec!(10.00);
        contract.ask = dec!(12.00);

        // $5M at the bid on a high-volume ticker: 0.2 + 0 - 0.1
        let detection = detector.check_premium("SPY", &contract).unwrap();
        assert_eq!(detection.confidence, dec!(0.1));
        assert_eq!(detection.metric("aggressiveness"), Some(dec!(0)));
    }

    #[test]
    fn test_aggressiveness_empty_band() {
        let mut contract = create_test_contract("C1", OptionType::Call, 100);
        contract.bid = dec!(2.00);
        contract.ask = dec!(2.00);
        assert_eq!(aggressiveness(&contract), dec!(0.5));
    }

    #[test]
    fn test_tight_spread() {
        let detector = AnomalyDetector::with_defaults();
        let mut contract = create_test_contract("C1", OptionType::Call, 5_000);
        contract.bid = dec!(1.99);
        contract.ask = dec!(2.01);

        let detection = detector.check_tight_spread(&contract).unwrap();
        assert_eq!(detection.confidence, dec!(0.5));
        assert_eq!(detection.metric("spread_pct"), Some(dec!(0.01)));

        contract.volume = 1_000;
        assert!(detector.check_tight_spread(&contract).is_none());
    }

    #[test]
    fn test_wide_spread_not_flagged() {
        let detector = AnomalyDetector::with_defaults();
        let contract = create_test_contract("C1", OptionType::Call, 50_000);
        assert!(detector.check_tight_spread(&contract).is_none());
    }

    #[test]
    fn test_put_call_bearish() {
        let detector = AnomalyDetector::with_defaults();
        let chain = create_test_chain(
            "XYZ",
            vec![
                create_test_contract("C1", OptionType::Call, 1_000),
                create_test_contract("P1", OptionType::Put, 3_000),
                create_test_contract("P2", OptionType::Put, 5_000),
            ],
        );
        let candidates: Vec<&Contract> = chain.contracts.iter().collect();

        let detection = detector.check_put_call_ratio(&chain, &candidates).unwrap();
        assert_eq!(detection.kind, DetectionKind::PutCallRatio);
        assert_eq!(detection.sentiment, Sentiment::Bearish);
        assert_eq!(detection.symbol(), "P2");
        // 0.4 + (8 - 3) / 5 capped at 0.8
        assert_eq!(detection.confidence, dec!(0.8));
    }

    #[test]
    fn test_put_call_bullish() {
        let detector = AnomalyDetector::with_defaults();
        let chain = create_test_chain(
            "XYZ",
            vec![
                create_test_contract("C1", OptionType::Call, 10_000),
                create_test_contract("P1", OptionType::Put, 1_000),
            ],
        );
        let candidates: Vec<&Contract> = chain.contracts.iter().collect();

        let detection = detector.check_put_call_ratio(&chain, &candidates).unwrap();
        assert_eq!(detection.sentiment, Sentiment::Bullish);
        assert_eq!(detection.symbol(), "C1");
        // 0.4 + (0.2 - 0.1) / 0.2 * 0.4
        assert_eq!(detection.confidence, dec!(0.6));
    }

    #[test]
    fn test_put_call_neutral_and_degenerate() {
        let detector = AnomalyDetector::with_defaults();
        let balanced = create_test_chain(
            "XYZ",
            vec![
                create_test_contract("C1", OptionType::Call, 2_000),
                create_test_contract("P1", OptionType::Put, 2_000),
            ],
        );
        let candidates: Vec<&Contract> = balanced.contracts.iter().collect();
        assert!(detector.check_put_call_ratio(&balanced, &candidates).is_none());

        let no_calls = create_test_chain(
            "XYZ",
            vec![create_test_contract("P1", OptionType::Put, 5_000)],
        );
        let candidates: Vec<&Contract> = no_calls.contracts.iter().collect();
        assert!(detector.check_put_call_ratio(&no_calls, &candidates).is_none());
    }

    #[test]
    fn test_prefilter_rules() {
        let detector = AnomalyDetector::with_defaults();

        let mut short_dated = create_test_contract("C1", OptionType::Call, 500);
        short_dated.expiry = NaiveDate::from_ymd_opt(2026, 10, 25).unwrap();
        assert_eq!(
            detector.prefilter(&short_dated, dec!(100)),
            Err(SkipReason::TooCloseToExpiry(6))
        );

        let thin = create_test_contract("C2", OptionType::Call, 50);
        assert_eq!(
            detector.prefilter(&thin, dec!(100)),
            Err(SkipReason::LowVolume(50))
        );

        let mut far = create_test_contract("C3", OptionType::Call, 500);
        far.strike = dec!(140);
        assert!(matches!(
            detector.prefilter(&far, dec!(100)),
            Err(SkipReason::StrikeOutOfBand(_))
        ));

        let mut inverted = create_test_contract("C4", OptionType::Call, 500);
        inverted.bid = dec!(3.00);
        assert!(matches!(
            detector.prefilter(&inverted, dec!(100)),
            Err(SkipReason::Invalid(_))
        ));

        let ok = create_test_contract("C5", OptionType::Call, 500);
        assert!(detector.prefilter(&ok, dec!(100)).is_ok());
    }

    #[test]
    fn test_detect_skips_invalid_without_affecting_siblings() {
        let detector = AnomalyDetector::with_defaults();
        let mut broken = create_test_contract("BAD", OptionType::Call, 60_000);
        broken.bid = dec!(5.00);
        let good = create_test_contract("GOOD", OptionType::Call, 6_000);

        let mut baseline = HistoricalBaseline::new("XYZ");
        baseline.insert("GOOD", 1_000, 2_000);
        baseline.insert("BAD", 1_000, 2_000);

        let chain = create_test_chain("XYZ", vec![broken, good]);
        let detections = detector.detect(&chain, Some(&baseline));

        assert!(detections.iter().all(|d| d.symbol() == "GOOD"));
        assert!(detections
            .iter()
            .any(|d| d.kind == DetectionKind::VolumeAnomaly));
    }

    #[test]
    fn test_detect_is_deterministic() {
        let detector = AnomalyDetector::with_defaults();
        let chain = create_test_chain(
            "XYZ",
            vec![
                create_test_contract("C1", OptionType::Call, 12_000),
                create_test_contract("P1", OptionType::Put, 800),
            ],
        );

        let first = detector.detect(&chain, None);
        let second = detector.detect(&chain, None);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.kind, b.kind);
            assert_eq!(a.confidence, b.confidence);
        }
        assert!(first
            .iter()
            .all(|d| d.confidence >= dec!(0) && d.confidence <= dec!(1)));
    }
}
