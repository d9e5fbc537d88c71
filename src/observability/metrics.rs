//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dnsbalancer_queries_total` (counter): forwarded queries by backend, outcome
//! - `dnsbalancer_query_duration_seconds` (histogram): backend round trip
//! - `dnsbalancer_queries_dropped_total` (counter): queries dropped by reason
//! - `dnsbalancer_backend_health` (gauge): 1=healthy, 0=unhealthy
//! - `dnsbalancer_health_checks_total` (counter): probes by backend, result
//!
//! Without an installed recorder every call here is a no-op.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!("dnsbalancer_queries_total", "Queries forwarded to backends");
    describe_histogram!(
        "dnsbalancer_query_duration_seconds",
        Unit::Seconds,
        "Backend round trip time"
    );
    describe_counter!(
        "dnsbalancer_queries_dropped_total",
        "Queries dropped without forwarding"
    );
    describe_gauge!("dnsbalancer_backend_health", "1 if the backend is in rotation");
    describe_counter!("dnsbalancer_health_checks_total", "Health probes sent");

    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_query(backend: &str, outcome: &'static str, start: Instant) {
    counter!(
        "dnsbalancer_queries_total",
        "backend" => backend.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("dnsbalancer_query_duration_seconds", "backend" => backend.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_dropped(reason: &'static str) {
    counter!("dnsbalancer_queries_dropped_total", "reason" => reason).increment(1);
}

pub fn record_backend_health(backend: &str, healthy: bool) {
    gauge!("dnsbalancer_backend_health", "backend" => backend.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_health_check(backend: &str, success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!(
        "dnsbalancer_health_checks_total",
        "backend" => backend.to_string(),
        "result" => result
    )
    .increment(1);
}
