//! Spread correlation module
//!
//! Annotates detections that look like legs of the same vertical or
//! calendar spread.

mod matcher;
mod types;

pub use matcher::{RatioBand, SpreadConfig, SpreadMatcher};
pub use types::{SpreadAnalysis, SpreadIndicator, SpreadType, MAX_SPREAD_CONFIDENCE};
