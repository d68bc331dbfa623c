//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define server metrics (requests, latency, errors, connections)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `http_connections_total` (counter): accepted connections
//! - `http_active_connections` (gauge): current connection count
//! - `http_requests_total` (counter): finished exchanges by method, status
//! - `http_request_duration_seconds` (histogram): parse-to-finish latency
//! - `http_bad_requests_total` (counter): rejected requests by reason
//! - `http_websocket_upgrades_total` (counter)
//! - `http_tls_handshake_failures_total` (counter)
//!
//! # Design Decisions
//! - Without an installed recorder every call is a no-op
//! - Histogram buckets tuned for typical web latencies

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};

const LATENCY_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

/// Install the Prometheus recorder and serve it on `addr`.
///
/// Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            LATENCY_BUCKETS,
        )?
        .install()?;

    ::metrics::describe_counter!("http_requests_total", "Finished HTTP exchanges");
    ::metrics::describe_gauge!("http_active_connections", "Open client connections");
    ::metrics::describe_histogram!(
        "http_request_duration_seconds",
        ::metrics::Unit::Seconds,
        "Time from parsed request head to finished response"
    );
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_connection_opened(active: u64) {
    ::metrics::counter!("http_connections_total").increment(1);
    ::metrics::gauge!("http_active_connections").set(active as f64);
}

pub fn record_connection_closed(active: u64) {
    ::metrics::gauge!("http_active_connections").set(active as f64);
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    ::metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("http_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_bad_request(reason: &'static str) {
    ::metrics::counter!("http_bad_requests_total", "reason" => reason).increment(1);
}

pub fn record_websocket_upgrade() {
    ::metrics::counter!("http_websocket_upgrades_total").increment(1);
}

pub fn record_tls_failure() {
    ::metrics::counter!("http_tls_handshake_failures_total").increment(1);
}
