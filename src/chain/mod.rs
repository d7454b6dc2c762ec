//! Options chain snapshot model
//!
//! Immutable value types for a single contract snapshot, a whole chain,
//! and the historical baseline the detector compares against.

mod baseline;
mod types;

pub use baseline::{Baseline, HistoricalBaseline};
pub use types::{Chain, Contract, ContractError, Greeks, OptionType};
