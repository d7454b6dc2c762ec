//! Signal grading module
//!
//! Scoring, risk assessment, and post-filtering of graded signals

mod filter;
mod grader;
mod risk;
mod types;

pub use filter::{FilterConfig, FilterResult, RejectReason, SignalFilter};
pub use grader::{GradingConfig, KindWeights, SignalGrader};
pub use risk::{assess, RiskAssessment, RiskConfig};
pub use types::{Grade, IdentityKey, Moneyness, RiskFactor, RiskLevel, Signal, MAX_SCORE};
