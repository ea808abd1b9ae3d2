//! Metrics collection and exposition.
//!
//! # Metrics
//! - `bridge_connections_total` (counter): accepted CLI connections
//! - `bridge_active_connections` (gauge): currently open CLI connections
//! - `bridge_commands_total` (counter): handled request lines by command, status
//! - `bridge_auth_attempts_total` (counter): auth attempts by result
//! - `bridge_forwards_total` (counter): control-plane calls by kind, outcome

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::backend::ForwardOutcome;
use crate::protocol::ResponseStatus;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!(address = %addr, "Metrics endpoint started");
    Ok(())
}

pub fn record_connection_opened() {
    counter!("bridge_connections_total").increment(1);
    gauge!("bridge_active_connections").increment(1.0);
}

pub fn record_connection_closed() {
    gauge!("bridge_active_connections").decrement(1.0);
}

pub fn record_command(command: &'static str, status: ResponseStatus) {
    counter!("bridge_commands_total", "command" => command, "status" => status.as_str())
        .increment(1);
}

pub fn record_auth(accepted: bool) {
    let result = if accepted { "accepted" } else { "rejected" };
    counter!("bridge_auth_attempts_total", "result" => result).increment(1);
}

pub fn record_forward(kind: &'static str, outcome: ForwardOutcome) {
    counter!("bridge_forwards_total", "kind" => kind, "outcome" => outcome.as_str()).increment(1);
}
