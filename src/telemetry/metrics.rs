//! Prometheus metrics
//!
//! Thin wrappers over the `metrics` macros. Without an installed recorder
//! (tests, or no `metrics_port`) every call is a no-op.

use std::time::Duration;

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// Upstream klines request, including body parse
    Fetch,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Connected subscribers
    Subscribers,
    /// Candles in the current snapshot
    SnapshotCandles,
}

/// How a snapshot reached a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryKind {
    /// Targeted delivery to a newly connected subscriber
    Replay,
    /// Fan-out to every subscriber
    Publish,
}

impl DeliveryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryKind::Replay => "replay",
            DeliveryKind::Publish => "publish",
        }
    }
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let metric_name = match metric {
        LatencyMetric::Fetch => "kline_relay_fetch_latency_ms",
    };

    metrics::histogram!(metric_name).record(duration.as_secs_f64() * 1000.0);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let metric_name = match metric {
        GaugeMetric::Subscribers => "kline_relay_subscribers",
        GaugeMetric::SnapshotCandles => "kline_relay_snapshot_candles",
    };

    metrics::gauge!(metric_name).set(value);
}

/// Count a fetch cycle by outcome (`success` or a failure category)
pub fn record_fetch(outcome: &'static str) {
    metrics::counter!("kline_relay_fetch_total", "outcome" => outcome).increment(1);
}

/// Count a successful delivery
pub fn record_delivery(kind: DeliveryKind) {
    metrics::counter!("kline_relay_deliveries_total", "kind" => kind.as_str()).increment(1);
}

/// Count a dropped delivery (`full` or `closed`)
pub fn record_delivery_failure(reason: &'static str) {
    metrics::counter!("kline_relay_delivery_failures_total", "reason" => reason).increment(1);
}
