//! Metrics collection and exposition.
//!
//! # Metrics
//! - `api_requests_total` (counter): dispatched requests by route kind,
//!   version and status
//! - `api_request_duration_seconds` (histogram): dispatch latency
//! - `api_failures_total` (counter): failures by kind and outcome
//!   (`translated`, `overridden`, `propagated`)
//!
//! # Design Decisions
//! - Macros are no-ops until a recorder is installed, so tests need no setup
//! - Prometheus exposition runs on its own listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::exception::failure::FailureKind;

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed dispatch.
pub fn record_dispatch(kind: &'static str, version: &str, status: u16, start: Instant) {
    let labels = [
        ("kind", kind.to_string()),
        ("version", version.to_string()),
        ("status", status.to_string()),
    ];
    counter!("api_requests_total", &labels[..]).increment(1);
    histogram!("api_request_duration_seconds", &labels[..2]).record(start.elapsed().as_secs_f64());
}

/// Record how a failure left the dispatcher.
pub fn record_failure(kind: FailureKind, outcome: &'static str) {
    let kind = match kind {
        FailureKind::Http => "http",
        FailureKind::Resource => "resource",
        FailureKind::Configuration => "configuration",
        FailureKind::Other => "other",
    };
    counter!("api_failures_total", "kind" => kind, "outcome" => outcome).increment(1);
}
