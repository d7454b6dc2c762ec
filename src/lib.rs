//! unusual-flow: unusual options activity scanner
//!
//! This library provides the core components for:
//! - Anomaly detection over option chain snapshots
//! - Multi-leg spread matching
//! - Signal grading, risk tagging and post-filtering
//! - Cross-scan continuity tracking against a signal store
//! - Concurrent, rate-limit aware scan orchestration
//! - Chain providers (HTTP, files) with TTL caching
//! - Signal export to Parquet
//! - Structured logging and Prometheus metrics

pub mod chain;
pub mod cli;
pub mod config;
pub mod continuity;
pub mod data;
pub mod decimal;
pub mod detect;
pub mod provider;
pub mod scan;
pub mod signal;
pub mod spread;
pub mod store;
pub mod telemetry;
