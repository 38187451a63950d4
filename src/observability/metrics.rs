//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): requests by method, outward status
//! - `relay_request_duration_seconds` (histogram): handler latency
//! - `relay_upstream_outcomes_total` (counter): success / status / failed

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime. Failure is logged, not fatal.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one handled relay request.
pub fn record_request(method: &str, status: u16, start_time: Instant) {
    metrics::counter!(
        "relay_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("relay_request_duration_seconds").record(start_time.elapsed().as_secs_f64());
}

/// Record how an upstream fetch ended.
pub fn record_upstream(outcome: &'static str) {
    metrics::counter!("relay_upstream_outcomes_total", "outcome" => outcome).increment(1);
}
