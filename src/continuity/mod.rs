//! Continuity module
//!
//! Folds repeated detections of the same contract into one signal group

mod tracker;

pub use tracker::{ContinuityConfig, ContinuityReport, ContinuityTracker, ProcessOutcome};
