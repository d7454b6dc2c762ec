//! Prometheus metrics

use std::time::Duration;

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// One ticker: fetch, detect, grade
    TickerScan,
    /// One batch of tickers
    BatchScan,
    /// Continuity pass over a batch of signals
    ContinuityBatch,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Graded signals before the per-ticker cap
    CandidateSignals,
    /// Signals kept after the cap
    KeptSignals,
    /// Share of the last batch that was rate limited
    RateLimitedFraction,
    /// Active signals in the store
    ActiveSignals,
}

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    Detections,
    SpreadAnnotations,
    SignalsGraded,
    SignalsFiltered,
    TickersRateLimited,
    TickersUnavailable,
    TickersFailed,
    ContinuityCreated,
    ContinuityUpdated,
    ContinuityFailed,
    SignalsDeactivated,
}

fn latency_name(metric: LatencyMetric) -> &'static str {
    match metric {
        LatencyMetric::TickerScan => "uflow_ticker_scan_latency_ms",
        LatencyMetric::BatchScan => "uflow_batch_scan_latency_ms",
        LatencyMetric::ContinuityBatch => "uflow_continuity_batch_latency_ms",
    }
}

fn gauge_name(metric: GaugeMetric) -> &'static str {
    match metric {
        GaugeMetric::CandidateSignals => "uflow_candidate_signals",
        GaugeMetric::KeptSignals => "uflow_kept_signals",
        GaugeMetric::RateLimitedFraction => "uflow_rate_limited_fraction",
        GaugeMetric::ActiveSignals => "uflow_active_signals",
    }
}

fn counter_name(metric: CounterMetric) -> &'static str {
    match metric {
        CounterMetric::Detections => "uflow_detections_total",
        CounterMetric::SpreadAnnotations => "uflow_spread_annotations_total",
        CounterMetric::SignalsGraded => "uflow_signals_graded_total",
        CounterMetric::SignalsFiltered => "uflow_signals_filtered_total",
        CounterMetric::TickersRateLimited => "uflow_tickers_rate_limited_total",
        CounterMetric::TickersUnavailable => "uflow_tickers_unavailable_total",
        CounterMetric::TickersFailed => "uflow_tickers_failed_total",
        CounterMetric::ContinuityCreated => "uflow_continuity_created_total",
        CounterMetric::ContinuityUpdated => "uflow_continuity_updated_total",
        CounterMetric::ContinuityFailed => "uflow_continuity_failed_total",
        CounterMetric::SignalsDeactivated => "uflow_signals_deactivated_total",
    }
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let metric_name = latency_name(metric);
    ::metrics::histogram!(metric_name).record(duration.as_secs_f64() * 1000.0);
    tracing::trace!(
        metric = metric_name,
        value_ms = duration.as_millis() as u64,
        "Recording latency"
    );
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    ::metrics::gauge!(gauge_name(metric)).set(value);
}

/// Increment a counter
pub fn increment_counter(metric: CounterMetric, value: u64) {
    ::metrics::counter!(counter_name(metric)).increment(value);
}

/// Increment a counter under a `kind` label
pub fn increment_labeled(metric: CounterMetric, kind: &'static str, value: u64) {
    ::metrics::counter!(counter_name(metric), "kind" => kind).increment(value);
}
