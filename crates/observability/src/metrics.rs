//! Prometheus metrics infrastructure
//!
//! This module provides utilities for initializing the Prometheus exporter
//! and the metric set recorded by the order-entry path. Without an installed
//! exporter every handle is a no-op.

use metrics::{counter, gauge, histogram, Gauge};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Initialize the Prometheus metrics exporter
///
/// This starts an HTTP server on the specified port that exposes metrics
/// at the `/metrics` endpoint.
///
/// ```ignore
/// observability::metrics::init_metrics(9090)?;
/// // Metrics available at http://localhost:9090/metrics
/// ```
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    tracing::info!(%addr, "Metrics server listening");
    Ok(())
}

/// Metrics for the order-entry stream
///
/// * `order_entry_requests_total{operation, outcome}` - requests handled
/// * `order_entry_request_duration_seconds{operation}` - time spent applying a request
/// * `order_entry_active_connections` - open order-entry streams
/// * `order_entry_malformed_frames_total` - frames that did not parse as a request
#[derive(Clone)]
pub struct OrderEntryMetrics {
    active_connections: Gauge,
}

impl OrderEntryMetrics {
    pub fn new() -> Self {
        Self {
            active_connections: gauge!("order_entry_active_connections"),
        }
    }

    /// Record one handled request
    ///
    /// `outcome` is `accepted`, `modified`, `cancelled`, or a reject reason.
    pub fn record_request(&self, operation: &'static str, outcome: &'static str, duration: Duration) {
        counter!("order_entry_requests_total", "operation" => operation, "outcome" => outcome).increment(1);
        histogram!("order_entry_request_duration_seconds", "operation" => operation)
            .record(duration.as_secs_f64());
    }

    pub fn record_malformed(&self) {
        counter!("order_entry_malformed_frames_total").increment(1);
    }

    pub fn connection_opened(&self) {
        self.active_connections.increment(1.0);
    }

    pub fn connection_closed(&self) {
        self.active_connections.decrement(1.0);
    }
}

impl Default for OrderEntryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Records the request when dropped
///
/// ```ignore
/// let mut guard = RequestMetricsGuard::new(&metrics, "add_order");
/// guard.set_outcome("accepted");
/// ```
pub struct RequestMetricsGuard<'a> {
    metrics: &'a OrderEntryMetrics,
    operation: &'static str,
    outcome: &'static str,
    start: Instant,
}

impl<'a> RequestMetricsGuard<'a> {
    pub fn new(metrics: &'a OrderEntryMetrics, operation: &'static str) -> Self {
        Self {
            metrics,
            operation,
            outcome: "unknown",
            start: Instant::now(),
        }
    }

    pub fn set_outcome(&mut self, outcome: &'static str) {
        self.outcome = outcome;
    }
}

impl Drop for RequestMetricsGuard<'_> {
    fn drop(&mut self) {
        self.metrics
            .record_request(self.operation, self.outcome, self.start.elapsed());
    }
}
