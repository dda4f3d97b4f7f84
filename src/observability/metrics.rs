//! Metrics collection and exposition.
//!
//! # Metrics
//! - `route_lookups_total` (counter): path resolutions by outcome
//!   (`found`, `not_found`, `error`)
//! - `access_decisions_total` (counter): decisions by mode and result
//! - `route_dumps_total` (counter): committed dumps by route set
//! - `route_table_rows` (gauge): rows in a route set after its last dump
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter, serving scrapes on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_lookup(outcome: &'static str) {
    counter!("route_lookups_total", "outcome" => outcome).increment(1);
}

pub fn record_decision(mode: &'static str, result: &'static str) {
    counter!("access_decisions_total", "mode" => mode, "result" => result).increment(1);
}

pub fn record_dump(route_set: &str, rows: usize) {
    let route_set = route_set.to_string();
    counter!("route_dumps_total", "route_set" => route_set.clone()).increment(1);
    gauge!("route_table_rows", "route_set" => route_set).set(rows as f64);
}
