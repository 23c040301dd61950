//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lb_requests_total` (counter): requests by method, status
//! - `lb_request_duration_seconds` (histogram): latency distribution
//! - `lb_backend_alive` (gauge): 1=alive, 0=down, per backend
//! - `lb_upstream_failures_total` (counter): transport errors per backend
//! - `lb_rate_limited_total` (counter): requests rejected with 429

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Serve Prometheus metrics on `addr`. Needs a running Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let status = status.to_string();
    counter!("lb_requests_total", "method" => method.to_string(), "status" => status.clone())
        .increment(1);
    histogram!("lb_request_duration_seconds", "method" => method.to_string(), "status" => status)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_backend_health(backend: &str, alive: bool) {
    gauge!("lb_backend_alive", "backend" => backend.to_string()).set(if alive { 1.0 } else { 0.0 });
}

pub fn record_upstream_failure(backend: &str) {
    counter!("lb_upstream_failures_total", "backend" => backend.to_string()).increment(1);
}

pub fn record_rate_limited() {
    counter!("lb_rate_limited_total").increment(1);
}
