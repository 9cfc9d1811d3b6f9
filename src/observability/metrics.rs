//! Metrics collection and exposition.
//!
//! # Metrics
//! - `health_node_up` (gauge): 1 when the node produced a usable snapshot
//! - `health_current_slot`, `health_processed_slot`, `health_minimum_slot`,
//!   `health_slots_stored` (gauges, per node)
//! - `health_prev_epoch_blocks`, `health_cur_epoch_blocks` (gauges, per node)
//! - `health_poll_cycles_total` (counter): cycles by outcome
//! - `health_load_failures_total` (counter): load failures by reason
//! - `health_status_up` (gauge): 1 when the target is Up
//! - `health_agent_responses_total` (counter): served lines by kind
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::health::snapshot::NodeSnapshot;
use crate::health::state::Status;

/// Install the Prometheus recorder with its own scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_node_health(node: &str, healthy: bool) {
    metrics::gauge!("health_node_up", "node" => node.to_string()).set(if healthy { 1.0 } else { 0.0 });
}

/// Per-node gauges for a usable snapshot.
pub fn record_snapshot(snapshot: &NodeSnapshot) {
    let node = snapshot.node.clone();
    metrics::gauge!("health_current_slot", "node" => node.clone()).set(snapshot.current_slot as f64);
    metrics::gauge!("health_processed_slot", "node" => node.clone()).set(snapshot.processed_slot as f64);
    metrics::gauge!("health_minimum_slot", "node" => node.clone()).set(snapshot.minimum_slot as f64);
    metrics::gauge!("health_slots_stored", "node" => node.clone())
        .set(snapshot.current_slot.saturating_sub(snapshot.minimum_slot) as f64);
    metrics::gauge!("health_prev_epoch_blocks", "node" => node.clone())
        .set(snapshot.prev_epoch_block_count() as f64);
    metrics::gauge!("health_cur_epoch_blocks", "node" => node).set(snapshot.cur_epoch_block_count() as f64);
}

pub fn record_poll_cycle(outcome: &'static str) {
    metrics::counter!("health_poll_cycles_total", "outcome" => outcome).increment(1);
}

pub fn record_load_failure(reason: &str) {
    metrics::counter!("health_load_failures_total", "reason" => reason.to_string()).increment(1);
}

pub fn record_status(status: Status) {
    metrics::gauge!("health_status_up").set(if status == Status::Up { 1.0 } else { 0.0 });
}

pub fn record_agent_response(kind: &'static str) {
    metrics::counter!("health_agent_responses_total", "kind" => kind).increment(1);
}
