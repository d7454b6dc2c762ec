//! Store types

use crate::signal::Signal;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Signal not found: {0}")]
    NotFound(Uuid),

    #[error("Active signal already exists for {0}")]
    DuplicateActive(String),

    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Time window of {0} hours is out of range")]
    InvalidWindow(i64),
}

/// Longest lookback or staleness window accepted, in hours (ten years)
pub const MAX_WINDOW_HOURS: i64 = 87_600;

/// Start of a window reaching `hours` back from `now`
pub fn window_start(now: DateTime<Utc>, hours: i64) -> Result<DateTime<Utc>, StoreError> {
    if !(0..=MAX_WINDOW_HOURS).contains(&hours) {
        return Err(StoreError::InvalidWindow(hours));
    }
    Duration::try_hours(hours)
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or(StoreError::InvalidWindow(hours))
}

/// Partial update applied to a stored signal.
///
/// Identity fields, `id`, `signal_group_id` and `first_detected_at` are never
/// touched, and a patch can only deactivate a row, never reactivate it.
#[derive(Debug, Clone, Default)]
pub struct SignalPatch {
    /// Re-detection whose market, score, risk, flag and spread fields are merged
    pub observation: Option<Signal>,
    pub detection_count: Option<u32>,
    pub last_detected_at: Option<DateTime<Utc>>,
    pub deactivate: bool,
}

impl SignalPatch {
    /// Merge a fresh observation into an existing group
    pub fn redetection(fresh: &Signal, detection_count: u32, at: DateTime<Utc>) -> Self {
        Self {
            observation: Some(fresh.clone()),
            detection_count: Some(detection_count),
            last_detected_at: Some(at),
            deactivate: false,
        }
    }

    /// Retire a row
    pub fn deactivate() -> Self {
        Self {
            deactivate: true,
            ..Self::default()
        }
    }

    pub fn apply_to(self, target: &mut Signal) {
        if let Some(fresh) = self.observation {
            target.underlying_price = fresh.underlying_price;
            target.last_price = fresh.last_price;
            target.volume = fresh.volume;
            target.open_interest = fresh.open_interest;
            target.premium_flow = fresh.premium_flow;
            target.implied_volatility = fresh.implied_volatility;
            target.sentiment = fresh.sentiment;
            target.moneyness = fresh.moneyness;
            target.days_to_expiry = fresh.days_to_expiry;

            target.has_volume_anomaly = fresh.has_volume_anomaly;
            target.has_oi_spike = fresh.has_oi_spike;
            target.has_premium_flow = fresh.has_premium_flow;
            target.has_tight_spread = fresh.has_tight_spread;
            target.has_put_call_skew = fresh.has_put_call_skew;
            target.is_heuristic = fresh.is_heuristic;

            target.overall_score = fresh.overall_score;
            target.grade = fresh.grade;
            target.confidence = fresh.confidence;
            target.risk_level = fresh.risk_level;
            target.risk_factors = fresh.risk_factors;

            target.is_likely_spread = fresh.is_likely_spread;
            target.spread_confidence = fresh.spread_confidence;
            target.spread_type = fresh.spread_type;
            target.matched_leg_symbols = fresh.matched_leg_symbols;
            target.spread_strike_width = fresh.spread_strike_width;
            target.spread_net_premium = fresh.spread_net_premium;
            target.spread_reasoning = fresh.spread_reasoning;
        }
        if let Some(count) = self.detection_count {
            target.detection_count = count;
        }
        if let Some(at) = self.last_detected_at {
            target.last_detected_at = at;
        }
        if self.deactivate {
            target.is_active = false;
        }
    }
}
