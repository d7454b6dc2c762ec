//! Scan command implementation

use super::output::{print_json, print_signal_table, OutputFormat};
use crate::config::Config;
use crate::continuity::ContinuityTracker;
use crate::data::SignalParquetWriter;
use crate::detect::AnomalyDetector;
use crate::provider::{CachedProvider, ChainProvider, FileChainProvider, HttpChainProvider};
use crate::scan::{CycleReport, Scanner};
use crate::signal::{SignalFilter, SignalGrader};
use crate::spread::SpreadMatcher;
use crate::store::JsonFileStore;
use anyhow::Context;
use chrono::Utc;
use clap::Args;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Comma-separated tickers to scan
    #[arg(short, long, value_delimiter = ',')]
    pub tickers: Vec<String>,

    /// File with one ticker per line; `#` starts a comment
    #[arg(long)]
    pub tickers_file: Option<PathBuf>,

    /// Read chain snapshots from a directory instead of the API
    #[arg(long, conflicts_with = "api_url")]
    pub data_dir: Option<PathBuf>,

    /// Chain API base URL
    #[arg(long)]
    pub api_url: Option<String>,

    /// Signal store file
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Tickers in flight at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Signals kept per ticker
    #[arg(long)]
    pub cap: Option<usize>,

    /// Export kept signals to Parquet
    #[arg(long)]
    pub export: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

impl ScanArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let mut scan_config = config.scan.clone();
        if let Some(concurrency) = self.concurrency {
            scan_config.concurrency = concurrency.max(1);
        }
        if let Some(cap) = self.cap {
            scan_config.per_ticker_cap = cap.max(1);
        }

        let provider = self.build_provider(config)?;
        let tickers = self.resolve_tickers(config).await?;
        if tickers.is_empty() {
            anyhow::bail!("No tickers to scan: pass --tickers, --tickers-file, or set `tickers` in the config");
        }

        let scanner = Scanner::new(provider, scan_config)
            .with_detector(AnomalyDetector::new(config.detector.clone()))
            .with_matcher(SpreadMatcher::new(config.spread.clone()))
            .with_grader(SignalGrader::new(config.grading.clone()))
            .with_filter(SignalFilter::new(config.filter.clone()));

        let store_path = self.store.as_ref().unwrap_or(&config.store.path);
        let store = JsonFileStore::open(store_path)
            .await
            .with_context(|| format!("Failed to open signal store {}", store_path.display()))?;
        let tracker = ContinuityTracker::new(Arc::new(store), config.continuity.clone());

        tracing::info!(tickers = tickers.len(), "Starting scan");
        let report = scanner.run_cycle(&tickers, &tracker).await?;

        let exported = if self.export || config.data.export {
            let writer = SignalParquetWriter::new(&config.data.output_dir);
            writer.write(&report.scan.signals, Utc::now())?
        } else {
            None
        };
        if let Some(path) = &exported {
            tracing::info!(path = %path.display(), "Exported signals");
        }

        self.print(&report, exported.as_deref())
    }

    fn build_provider(&self, config: &Config) -> anyhow::Result<Arc<dyn ChainProvider>> {
        // An explicit --api-url overrides a configured data_dir
        let data_dir = match (&self.data_dir, &self.api_url) {
            (Some(dir), _) => Some(dir.clone()),
            (None, Some(_)) => None,
            (None, None) => config.provider.data_dir.clone(),
        };
        let api_url = self
            .api_url
            .clone()
            .or_else(|| config.provider.base_url.clone());

        let base: Arc<dyn ChainProvider> = match (data_dir, api_url) {
            (Some(dir), _) => Arc::new(FileChainProvider::new(dir)),
            (None, Some(url)) => Arc::new(HttpChainProvider::new(url, &config.provider)?),
            (None, None) => {
                anyhow::bail!("No chain source: pass --data-dir or --api-url, or set [provider]")
            }
        };

        if config.cache.enabled {
            Ok(Arc::new(CachedProvider::new(base, &config.cache)))
        } else {
            Ok(base)
        }
    }

    async fn resolve_tickers(&self, config: &Config) -> anyhow::Result<Vec<String>> {
        let mut raw: Vec<String> = self.tickers.clone();
        if let Some(path) = &self.tickers_file {
            raw.extend(read_tickers_file(path).await?);
        }
        if raw.is_empty() {
            raw = config.tickers.clone();
        }
        if raw.is_empty() {
            if let Some(dir) = self.data_dir.as_ref().or(config.provider.data_dir.as_ref()) {
                raw = FileChainProvider::new(dir).available_tickers().await?;
            }
        }
        Ok(normalize_tickers(raw))
    }

    fn print(&self, report: &CycleReport, exported: Option<&Path>) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => print_json(&serde_json::json!({
                "summary": report.scan.summary,
                "continuity": report.continuity,
                "deactivated": report.deactivated,
                "sweep_failed": report.sweep_failed,
                "exported": exported.map(|p| p.display().to_string()),
                "signals": report.scan.signals,
            })),
            OutputFormat::Table => {
                print_signal_table(&report.scan.signals);
                let summary = &report.scan.summary;
                println!();
                println!(
                    "Tickers: {} scanned, {} with signals, {} rate limited, {} unavailable, {} failed",
                    summary.tickers_scanned,
                    summary.tickers_with_signals,
                    summary.rate_limited,
                    summary.unavailable,
                    summary.failed
                );
                println!(
                    "Signals: {} graded, {} filtered, {} capped, {} kept",
                    summary.graded, summary.filtered_out, summary.capped, summary.kept
                );
                println!(
                    "Continuity: {} new, {} updated, {} failed, {} deactivated",
                    report.continuity.new_count,
                    report.continuity.updated_count,
                    report.continuity.failed_count,
                    report.deactivated
                );
                if report.sweep_failed {
                    println!("Warning: stale sweep failed; see logs");
                }
                if let Some(path) = exported {
                    println!("Exported: {}", path.display());
                }
                Ok(())
            }
        }
    }
}

async fn read_tickers_file(path: &Path) -> anyhow::Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read tickers file {}", path.display()))?;
    Ok(content
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Uppercase, drop blanks and duplicates, keep first-seen order
pub(crate) fn normalize_tickers(raw: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .map(|t| t.trim().to_ascii_uppercase())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tickers() {
        let raw = vec![
            " spy".to_string(),
            "XYZ".to_string(),
            "".to_string(),
            "Spy".to_string(),
        ];
        assert_eq!(normalize_tickers(raw), vec!["SPY", "XYZ"]);
    }

    #[tokio::test]
    async fn test_read_tickers_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchlist.txt");
        tokio::fs::write(&path, "spy\n# comment\n\nqqq # index\n")
            .await
            .unwrap();
        let tickers = read_tickers_file(&path).await.unwrap();
        assert_eq!(tickers, vec!["spy", "qqq"]);
    }
}
