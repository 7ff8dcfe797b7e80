//! Metrics collection and exposition.
//!
//! # Metrics
//! - `server_connections_accepted_total` (counter)
//! - `server_accept_errors_total` (counter)
//! - `server_decode_errors_total` (counter)
//! - `server_requests_total` (counter): by response status
//! - `server_handler_panics_total` (counter)
//! - `server_active_connections` (gauge): in-flight workers
//! - `server_request_duration_seconds` (histogram): dispatch latency

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_accepted() {
    counter!("server_connections_accepted_total").increment(1);
}

pub fn record_accept_error() {
    counter!("server_accept_errors_total").increment(1);
}

pub fn record_decode_error() {
    counter!("server_decode_errors_total").increment(1);
}

pub fn record_handler_panic() {
    counter!("server_handler_panics_total").increment(1);
}

/// Record a dispatched request. A request that never set a status is labelled "none".
pub fn record_request(status: Option<u16>, start: Instant) {
    let status = status.map_or_else(|| "none".to_string(), |s| s.to_string());
    counter!("server_requests_total", "status" => status).increment(1);
    histogram!("server_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn connection_opened() {
    gauge!("server_active_connections").increment(1.0);
}

pub fn connection_closed() {
    gauge!("server_active_connections").decrement(1.0);
}
