//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): handled requests by outcome
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency by outcome
//! - `gateway_fetch_duration_seconds` (histogram): backend fetch latency by result
//! - `gateway_pool_available` (gauge): free backend connection slots
//!
//! Recording is a no-op until a recorder is installed, so tests and library
//! users pay nothing unless `init_metrics` is called.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one handled request.
pub fn record_request(outcome: &'static str, start: Instant) {
    counter!("gateway_requests_total", "outcome" => outcome).increment(1);
    histogram!("gateway_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

/// Record one backend fetch.
pub fn record_fetch(success: bool, start: Instant) {
    let result = if success { "ok" } else { "error" };
    histogram!("gateway_fetch_duration_seconds", "result" => result)
        .record(start.elapsed().as_secs_f64());
}

pub fn set_pool_available(available: usize) {
    gauge!("gateway_pool_available").set(available as f64);
}
