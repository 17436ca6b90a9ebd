//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by route, status, outcome
//! - `gateway_request_duration_seconds` (histogram): latency by route
//! - `gateway_upstream_connections_total` (counter): checkouts by upstream, reuse

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics endpoint"),
    }
}

/// Record a completed request.
pub fn record_request(route: &str, status: u16, outcome: &'static str, elapsed: Duration) {
    metrics::counter!(
        "gateway_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string(),
        "outcome" => outcome,
    )
    .increment(1);

    metrics::histogram!(
        "gateway_request_duration_seconds",
        "route" => route.to_string(),
    )
    .record(elapsed.as_secs_f64());
}

/// Record an upstream connection checkout.
pub fn record_upstream_connection(upstream: &str, reused: bool) {
    metrics::counter!(
        "gateway_upstream_connections_total",
        "upstream" => upstream.to_string(),
        "reused" => if reused { "true" } else { "false" },
    )
    .increment(1);
}
