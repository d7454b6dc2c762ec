//! Anomaly detection module
//!
//! Turns a flat chain snapshot into zero or more `Detection`s per contract:
//! volume anomalies, open-interest spikes, premium flow, tight spreads, and a
//! chain-level put/call skew.

mod detector;
mod types;

pub use detector::{AnomalyDetector, DetectorConfig};
pub use types::{Detection, DetectionKind, Sentiment, SkipReason};
