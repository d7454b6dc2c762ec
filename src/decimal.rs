//! Decimal helpers shared by the scoring stages
//!
//! Every score in the pipeline is an exact `Decimal`, so repeated runs over
//! the same snapshot produce identical results.

use rust_decimal::Decimal;

/// `numerator / denominator`, or `None` when the denominator is zero
#[inline]
pub fn ratio(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    if denominator.is_zero() {
        return None;
    }
    numerator.checked_div(denominator)
}

/// Clamp into `[lo, hi]`
#[inline]
pub fn clamp(value: Decimal, lo: Decimal, hi: Decimal) -> Decimal {
    value.max(lo).min(hi)
}

/// Ratio of two counts, `None` when the denominator is zero
#[inline]
pub fn count_ratio(numerator: u64, denominator: u64) -> Option<Decimal> {
    ratio(Decimal::from(numerator), Decimal::from(denominator))
}
