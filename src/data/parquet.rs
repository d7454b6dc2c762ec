//! Parquet export of graded signals

use crate::signal::Signal;
use arrow::array::{ArrayRef, BooleanArray, StringArray, TimestampMicrosecondArray, UInt32Array, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::errors::ParquetError;
use parquet::file::properties::WriterProperties;
use serde::Deserialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Export errors
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Export I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),
}

/// Export configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Export every scan without the CLI flag
    pub export: bool,
    pub output_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            export: false,
            output_dir: PathBuf::from("./data"),
        }
    }
}

fn timestamp_field(name: &str) -> Field {
    Field::new(
        name,
        DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
        false,
    )
}

/// Signal export schema; decimals are strings for precision
pub fn signal_schema() -> Schema {
    Schema::new(vec![
        timestamp_field("exported_at"),
        Field::new("id", DataType::Utf8, false),
        Field::new("signal_group_id", DataType::Utf8, false),
        Field::new("ticker", DataType::Utf8, false),
        Field::new("option_symbol", DataType::Utf8, false),
        Field::new("strike", DataType::Utf8, false),
        Field::new("expiry", DataType::Utf8, false),
        Field::new("option_type", DataType::Utf8, false),
        Field::new("underlying_price", DataType::Utf8, false),
        Field::new("last_price", DataType::Utf8, false),
        Field::new("volume", DataType::UInt64, false),
        Field::new("open_interest", DataType::UInt64, false),
        Field::new("premium_flow", DataType::Utf8, false),
        Field::new("implied_volatility", DataType::Utf8, true),
        Field::new("sentiment", DataType::Utf8, false),
        Field::new("moneyness", DataType::Utf8, false),
        Field::new("overall_score", DataType::Utf8, false),
        Field::new("grade", DataType::Utf8, false),
        Field::new("confidence", DataType::Utf8, false),
        Field::new("risk_level", DataType::Utf8, false),
        Field::new("risk_factors", DataType::Utf8, false),
        Field::new("has_volume_anomaly", DataType::Boolean, false),
        Field::new("has_oi_spike", DataType::Boolean, false),
        Field::new("has_premium_flow", DataType::Boolean, false),
        Field::new("has_tight_spread", DataType::Boolean, false),
        Field::new("has_put_call_skew", DataType::Boolean, false),
        Field::new("is_heuristic", DataType::Boolean, false),
        Field::new("is_likely_spread", DataType::Boolean, false),
        Field::new("spread_type", DataType::Utf8, false),
        Field::new("spread_confidence", DataType::Utf8, false),
        Field::new("matched_leg_symbols", DataType::Utf8, false),
        timestamp_field("first_detected_at"),
        timestamp_field("last_detected_at"),
        Field::new("detection_count", DataType::UInt32, false),
        Field::new("is_active", DataType::Boolean, false),
    ])
}

fn strings<F>(signals: &[Signal], f: F) -> ArrayRef
where
    F: Fn(&Signal) -> String,
{
    Arc::new(StringArray::from(signals.iter().map(f).collect::<Vec<_>>()))
}

fn flags<F>(signals: &[Signal], f: F) -> ArrayRef
where
    F: Fn(&Signal) -> bool,
{
    Arc::new(BooleanArray::from(signals.iter().map(f).collect::<Vec<_>>()))
}

fn timestamps<F>(signals: &[Signal], f: F) -> ArrayRef
where
    F: Fn(&Signal) -> DateTime<Utc>,
{
    let micros: Vec<i64> = signals.iter().map(|s| f(s).timestamp_micros()).collect();
    Arc::new(TimestampMicrosecondArray::from(micros).with_timezone("UTC"))
}

/// Writes one Parquet file per export
pub struct SignalParquetWriter {
    output_dir: PathBuf,
}

impl SignalParquetWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `signals_YYYYmmdd_HHMMSS.parquet` under the output directory
    pub fn file_path(&self, timestamp: DateTime<Utc>) -> PathBuf {
        let filename = format!("signals_{}.parquet", timestamp.format("%Y%m%d_%H%M%S"));
        self.output_dir.join(filename)
    }

    /// Write signals to a new file; `Ok(None)` when there is nothing to write
    pub fn write(
        &self,
        signals: &[Signal],
        exported_at: DateTime<Utc>,
    ) -> Result<Option<PathBuf>, ExportError> {
        if signals.is_empty() {
            return Ok(None);
        }

        fs::create_dir_all(&self.output_dir)?;
        let path = self.file_path(exported_at);

        let schema = Arc::new(signal_schema());
        let columns: Vec<ArrayRef> = vec![
            timestamps(signals, |_| exported_at),
            strings(signals, |s| s.id.to_string()),
            strings(signals, |s| s.signal_group_id.to_string()),
            strings(signals, |s| s.ticker.clone()),
            strings(signals, |s| s.option_symbol.clone()),
            strings(signals, |s| s.strike.to_string()),
            strings(signals, |s| s.expiry.to_string()),
            strings(signals, |s| s.option_type.to_string()),
            strings(signals, |s| s.underlying_price.to_string()),
            strings(signals, |s| s.last_price.to_string()),
            Arc::new(UInt64Array::from(
                signals.iter().map(|s| s.volume).collect::<Vec<_>>(),
            )),
            Arc::new(UInt64Array::from(
                signals.iter().map(|s| s.open_interest).collect::<Vec<_>>(),
            )),
            strings(signals, |s| s.premium_flow.to_string()),
            Arc::new(StringArray::from(
                signals
                    .iter()
                    .map(|s| s.implied_volatility.map(|iv| iv.to_string()))
                    .collect::<Vec<_>>(),
            )),
            strings(signals, |s| s.sentiment.to_string()),
            strings(signals, |s| s.moneyness.to_string()),
            strings(signals, |s| s.overall_score.to_string()),
            strings(signals, |s| s.grade.to_string()),
            strings(signals, |s| s.confidence.to_string()),
            strings(signals, |s| s.risk_level.to_string()),
            strings(signals, |s| {
                s.risk_factors
                    .iter()
                    .map(|f| f.to_string())
                    .collect::<Vec<_>>()
                    .join(",")
            }),
            flags(signals, |s| s.has_volume_anomaly),
            flags(signals, |s| s.has_oi_spike),
            flags(signals, |s| s.has_premium_flow),
            flags(signals, |s| s.has_tight_spread),
            flags(signals, |s| s.has_put_call_skew),
            flags(signals, |s| s.is_heuristic),
            flags(signals, |s| s.is_likely_spread),
            strings(signals, |s| s.spread_type.to_string()),
            strings(signals, |s| s.spread_confidence.to_string()),
            strings(signals, |s| s.matched_leg_symbols.join(",")),
            timestamps(signals, |s| s.first_detected_at),
            timestamps(signals, |s| s.last_detected_at),
            Arc::new(UInt32Array::from(
                signals.iter().map(|s| s.detection_count).collect::<Vec<_>>(),
            )),
            flags(signals, |s| s.is_active),
        ];
        let batch = RecordBatch::try_new(schema.clone(), columns)?;

        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let file = File::create(&path)?;
        let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
        writer.write(&batch)?;
        writer.close()?;

        tracing::info!(path = ?path, count = signals.len(), "Exported signals to Parquet");

        Ok(Some(path))
    }
}
