//! Scan orchestration module
//!
//! Runs the detection pipeline across many tickers with bounded concurrency

mod scanner;
mod types;

pub use scanner::{apply_ticker_cap, backfill_continuity, Scanner};
pub use types::{
    ChainAnalysis, CycleReport, ScanConfig, ScanError, ScanReport, ScanSummary, TickerOutcome,
};
