//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define server metrics (request counts, latency, WebSocket sessions)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `khttpd_requests_total` (counter): total requests by method, status
//! - `khttpd_request_duration_seconds` (histogram): latency distribution
//! - `khttpd_websocket_sessions_active` (gauge): open WebSocket sessions
//! - `khttpd_websocket_messages_total` (counter): inbound messages by kind
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Labels limited to method, status and message kind

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let status = status.to_string();
    counter!("khttpd_requests_total", "method" => method.to_string(), "status" => status.clone())
        .increment(1);
    histogram!("khttpd_request_duration_seconds", "method" => method.to_string(), "status" => status)
        .record(start.elapsed().as_secs_f64());
}

pub fn websocket_session_opened() {
    gauge!("khttpd_websocket_sessions_active").increment(1.0);
}

pub fn websocket_session_closed() {
    gauge!("khttpd_websocket_sessions_active").decrement(1.0);
}

pub fn record_websocket_message(is_text: bool) {
    let kind = if is_text { "text" } else { "binary" };
    counter!("khttpd_websocket_messages_total", "kind" => kind).increment(1);
}
