//! Scan orchestrator
//!
//! Tickers run in batches. Inside a batch at most `concurrency` tickers are
//! in flight; each ticker's fetch is bounded by a timeout and its failure is
//! contained to that ticker. Results are aggregated by a single writer after
//! the batch completes.

use super::types::{
    ChainAnalysis, CycleReport, ScanConfig, ScanError, ScanReport, ScanSummary, TickerOutcome,
};
use crate::chain::{Chain, HistoricalBaseline};
use crate::continuity::{ContinuityReport, ContinuityTracker};
use crate::decimal::count_ratio;
use crate::detect::{AnomalyDetector, Detection};
use crate::provider::{ChainProvider, ProviderError};
use crate::signal::{FilterResult, Signal, SignalFilter, SignalGrader};
use crate::spread::SpreadMatcher;
use crate::store::SignalStore;
use crate::telemetry::{
    increment_counter, record_latency, set_gauge, CounterMetric, GaugeMetric, LatencyMetric,
};
use futures_util::stream::{self, StreamExt};
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Drives detection, spread matching, grading and filtering across tickers
pub struct Scanner<P> {
    provider: P,
    detector: AnomalyDetector,
    matcher: SpreadMatcher,
    grader: SignalGrader,
    filter: SignalFilter,
    config: ScanConfig,
}

impl<P: ChainProvider> Scanner<P> {
    /// Create a scanner with default pipeline stages
    pub fn new(provider: P, config: ScanConfig) -> Self {
        Self {
            provider,
            detector: AnomalyDetector::with_defaults(),
            matcher: SpreadMatcher::with_defaults(),
            grader: SignalGrader::with_defaults(),
            filter: SignalFilter::with_defaults(),
            config,
        }
    }

    pub fn with_detector(mut self, detector: AnomalyDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_matcher(mut self, matcher: SpreadMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_grader(mut self, grader: SignalGrader) -> Self {
        self.grader = grader;
        self
    }

    pub fn with_filter(mut self, filter: SignalFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Filtered signals for one chain
    pub fn analyze_chain(
        &self,
        chain: &Chain,
        baseline: Option<&HistoricalBaseline>,
    ) -> Vec<Signal> {
        self.analyze_chain_detailed(chain, baseline).signals
    }

    /// detect -> group by contract -> spread-annotate -> grade -> post-filter
    pub fn analyze_chain_detailed(
        &self,
        chain: &Chain,
        baseline: Option<&HistoricalBaseline>,
    ) -> ChainAnalysis {
        let mut detections = self.detector.detect(chain, baseline);
        if detections.is_empty() {
            return ChainAnalysis::default();
        }
        self.matcher.annotate(&mut detections);

        let mut by_contract: BTreeMap<String, Vec<Detection>> = BTreeMap::new();
        for detection in detections {
            by_contract
                .entry(detection.contract.symbol.clone())
                .or_default()
                .push(detection);
        }

        let mut analysis = ChainAnalysis::default();
        for group in by_contract.values() {
            let Some(signal) = self.grader.grade(&chain.ticker, chain.underlying_price, group)
            else {
                continue;
            };
            analysis.graded += 1;

            match self.filter.apply(&signal) {
                FilterResult::Pass => analysis.signals.push(signal),
                FilterResult::Reject(reason) => {
                    analysis.filtered_out += 1;
                    debug!(
                        ticker = %signal.ticker,
                        symbol = %signal.option_symbol,
                        score = %signal.overall_score,
                        reason = %reason,
                        "Signal filtered"
                    );
                }
            }
        }

        increment_counter(CounterMetric::SignalsFiltered, analysis.filtered_out as u64);
        analysis
    }

    /// Fetch chain and baseline; a baseline failure degrades to no history
    async fn fetch(
        &self,
        ticker: &str,
    ) -> Result<(Chain, Option<HistoricalBaseline>), ProviderError> {
        let chain = self.provider.get_options_chain(ticker).await?;
        let baseline = match self.provider.get_historical_baseline(ticker).await {
            Ok(baseline) => baseline,
            Err(e) => {
                warn!(ticker, error = %e, "Baseline unavailable, using heuristics");
                None
            }
        };
        Ok((chain, baseline))
    }

    /// Scan one ticker; never fails the batch
    pub async fn scan_ticker(&self, ticker: &str) -> TickerOutcome {
        let start = Instant::now();
        let fetched =
            match tokio::time::timeout(self.config.ticker_timeout(), self.fetch(ticker)).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout),
            };

        let outcome = match fetched {
            Ok((chain, baseline)) => {
                let analysis = self.analyze_chain_detailed(&chain, baseline.as_ref());
                info!(
                    ticker,
                    contracts = chain.contracts.len(),
                    graded = analysis.graded,
                    kept = analysis.signals.len(),
                    "Ticker scanned"
                );
                TickerOutcome::Analyzed(analysis)
            }
            Err(ProviderError::RateLimited) => {
                warn!(ticker, "Rate limited, skipping ticker this cycle");
                increment_counter(CounterMetric::TickersRateLimited, 1);
                TickerOutcome::RateLimited
            }
            Err(ProviderError::NotAvailable) => {
                info!(ticker, "No chain available");
                increment_counter(CounterMetric::TickersUnavailable, 1);
                TickerOutcome::Unavailable
            }
            Err(e) => {
                warn!(ticker, error = %e, "Ticker failed");
                increment_counter(CounterMetric::TickersFailed, 1);
                TickerOutcome::Failed(e)
            }
        };

        record_latency(LatencyMetric::TickerScan, start.elapsed());
        outcome
    }

    /// Scan all tickers, rank, and apply the per-ticker cap
    pub async fn scan(&self, tickers: &[String]) -> Result<ScanReport, ScanError> {
        let mut summary = ScanSummary::default();
        let mut candidates: Vec<Signal> = Vec::new();
        let mut signals_per_ticker: HashMap<String, usize> = HashMap::new();

        let batch_size = self.config.batch_size.max(1);
        let concurrency = self.config.concurrency.max(1);
        let batch_count = tickers.len().div_ceil(batch_size);

        for (index, batch) in tickers.chunks(batch_size).enumerate() {
            let start = Instant::now();
            let outcomes: Vec<TickerOutcome> = stream::iter(batch)
                .map(|ticker| self.scan_ticker(ticker))
                .buffer_unordered(concurrency)
                .collect()
                .await;

            let mut rate_limited = 0;
            for outcome in outcomes {
                summary.tickers_scanned += 1;
                match outcome {
                    TickerOutcome::Analyzed(analysis) => {
                        summary.graded += analysis.graded;
                        summary.filtered_out += analysis.filtered_out;
                        summary.candidates += analysis.signals.len();
                        for signal in analysis.signals {
                            *signals_per_ticker.entry(signal.ticker.clone()).or_default() += 1;
                            candidates.push(signal);
                        }
                    }
                    TickerOutcome::RateLimited => {
                        summary.rate_limited += 1;
                        rate_limited += 1;
                    }
                    TickerOutcome::Unavailable => summary.unavailable += 1,
                    TickerOutcome::Failed(_) => summary.failed += 1,
                }
            }
            record_latency(LatencyMetric::BatchScan, start.elapsed());

            let fraction = count_ratio(rate_limited, batch.len() as u64).unwrap_or_default();
            set_gauge(
                GaugeMetric::RateLimitedFraction,
                fraction.try_into().unwrap_or(0.0),
            );
            info!(
                batch = index + 1,
                batches = batch_count,
                tickers = batch.len(),
                rate_limited,
                "Batch complete"
            );

            let more_batches = index + 1 < batch_count;
            if more_batches && fraction > self.config.rate_limit_cooldown_fraction {
                summary.cooldowns += 1;
                warn!(
                    fraction = %fraction,
                    cooldown_secs = self.config.cooldown_secs,
                    "Rate limiting above threshold, cooling down"
                );
                tokio::time::sleep(self.config.cooldown()).await;
            }
        }

        if !tickers.is_empty() && summary.provider_failures() == summary.tickers_scanned {
            error!(tickers = tickers.len(), "Every ticker failed at the provider");
            return Err(ScanError::ProviderOutage {
                tickers: tickers.len(),
            });
        }

        summary.tickers_with_signals = signals_per_ticker.len();
        summary.capped = apply_ticker_cap(&mut candidates, self.config.per_ticker_cap);
        summary.kept = candidates.len();

        set_gauge(GaugeMetric::CandidateSignals, summary.candidates as f64);
        set_gauge(GaugeMetric::KeptSignals, summary.kept as f64);
        info!(
            tickers = summary.tickers_scanned,
            candidates = summary.candidates,
            capped = summary.capped,
            kept = summary.kept,
            rate_limited = summary.rate_limited,
            failed = summary.failed,
            "Scan complete"
        );

        Ok(ScanReport {
            signals: candidates,
            summary,
        })
    }

    /// Stale sweep, scan, then continuity backfill
    pub async fn run_cycle<S: SignalStore>(
        &self,
        tickers: &[String],
        tracker: &ContinuityTracker<S>,
    ) -> Result<CycleReport, ScanError> {
        // A failed sweep never blocks the scan
        let (deactivated, sweep_failed) =
            match tracker.mark_stale(tracker.config().stale_hours).await {
                Ok(count) => (count, false),
                Err(e) => {
                    warn!(error = %e, "Stale sweep failed, continuing with scan");
                    (0, true)
                }
            };
        let scan = self.scan(tickers).await?;
        let continuity = backfill_continuity(tracker, &scan.signals).await;
        Ok(CycleReport {
            scan,
            continuity,
            deactivated,
            sweep_failed,
        })
    }
}

/// Rank by score descending (ties by ticker, then symbol) and keep at most
/// `cap` signals per ticker. Returns how many were dropped.
pub fn apply_ticker_cap(signals: &mut Vec<Signal>, cap: usize) -> usize {
    signals.sort_by(|a, b| {
        b.overall_score
            .cmp(&a.overall_score)
            .then_with(|| a.ticker.cmp(&b.ticker))
            .then_with(|| a.option_symbol.cmp(&b.option_symbol))
    });

    let before = signals.len();
    let mut kept_per_ticker: HashMap<String, usize> = HashMap::new();
    signals.retain(|signal| {
        let kept = kept_per_ticker.entry(signal.ticker.clone()).or_default();
        if *kept < cap {
            *kept += 1;
            true
        } else {
            false
        }
    });
    before - signals.len()
}

/// Feed scan output into the continuity tracker
pub async fn backfill_continuity<S: SignalStore>(
    tracker: &ContinuityTracker<S>,
    signals: &[Signal],
) -> ContinuityReport {
    tracker.process_signals(signals).await
}
