//! Metrics collection and exposition.
//!
//! # Metrics
//! - `vhostd_requests_total` (counter): requests by method, status
//! - `vhostd_request_duration_seconds` (histogram): dispatch latency
//! - `vhostd_proxy_requests_total` (counter): proxied requests by backend, status
//! - `vhostd_tree_builds_total` (counter): tree builds and rebuilds
//! - `vhostd_vhosts` (gauge): vhosts in the current tree
//!
//! # Design Decisions
//! - Recording is a no-op until `init_metrics` installs the exporter
//! - Labels stay low-cardinality: no request paths

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "vhostd_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("vhostd_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_proxy(backend: &str, status: u16, start: Instant) {
    counter!(
        "vhostd_proxy_requests_total",
        "backend" => backend.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("vhostd_proxy_duration_seconds", "backend" => backend.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_tree_build(vhosts: usize) {
    counter!("vhostd_tree_builds_total").increment(1);
    gauge!("vhostd_vhosts").set(vhosts as f64);
}
