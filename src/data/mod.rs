//! Data export module
//!
//! Writes scan results to Parquet for offline review

mod parquet;

pub use parquet::{signal_schema, DataConfig, ExportError, SignalParquetWriter};
