//! Metrics collection and exposition.
//!
//! # Metrics
//! - `connector_requests_total` (counter): requests by route, status
//! - `connector_messages_enqueued_total` (counter): messages handed to the producer, by topic
//! - `connector_messages_dropped_total` (counter): messages dropped before enqueue, by topic, reason
//! - `connector_delivery_errors_total` (counter): broker-side delivery failures, by topic
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;

use metrics::counter;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and serve it on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(route: &str, status: u16) {
    counter!(
        "connector_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_enqueued(topic: &str) {
    counter!("connector_messages_enqueued_total", "topic" => topic.to_string()).increment(1);
}

pub fn record_dropped(topic: &str, reason: &'static str) {
    counter!(
        "connector_messages_dropped_total",
        "topic" => topic.to_string(),
        "reason" => reason
    )
    .increment(1);
}

pub fn record_delivery_failure(topic: &str) {
    counter!("connector_delivery_errors_total", "topic" => topic.to_string()).increment(1);
}
