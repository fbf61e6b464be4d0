//! Metrics collection and exposition.
//!
//! # Metrics
//! - `memserve_requests_total` (counter): requests by status
//! - `memserve_request_duration_seconds` (histogram): handler latency
//! - `memserve_worker_restarts_total` (counter): units replaced by the supervisor
//! - `memserve_asset_refreshes_total` (counter): watch-driven store changes
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - The Prometheus endpoint is opt-in

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(status: u16, start: Instant) {
    counter!("memserve_requests_total", "status" => status.to_string()).increment(1);
    histogram!("memserve_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_worker_restart() {
    counter!("memserve_worker_restarts_total").increment(1);
}

pub fn record_asset_refresh(kind: &'static str) {
    counter!("memserve_asset_refreshes_total", "kind" => kind).increment(1);
}
