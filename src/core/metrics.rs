// src/core/metrics.rs

//! Defines and registers Prometheus metrics for server monitoring.
//!
//! This module uses `lazy_static` to ensure that metrics are registered only once
//! globally for the entire application lifecycle.

use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Gauge, TextEncoder, register_counter, register_counter_vec,
    register_gauge,
};

lazy_static! {
    /// The number of connections currently tracked in the context registry.
    pub static ref ACTIVE_CONNECTIONS: Gauge =
        register_gauge!("spinelrpc_active_connections", "Number of connections currently registered.").unwrap();

    /// The total number of connections whose context was built and registered.
    pub static ref CONNECTIONS_ACCEPTED_TOTAL: Counter =
        register_counter!("spinelrpc_connections_accepted_total", "Total number of connections accepted and registered.").unwrap();
    /// The total number of accepted connections discarded before registration.
    pub static ref CONNECTION_SETUP_FAILURES_TOTAL: Counter =
        register_counter!("spinelrpc_connection_setup_failures_total", "Total number of connections discarded during transport/protocol setup.").unwrap();
    /// The total number of processor invocations.
    pub static ref DISPATCHES_TOTAL: Counter =
        register_counter!("spinelrpc_dispatches_total", "Total number of processor invocations.").unwrap();
    /// Events that referenced a connection no longer (or never) registered.
    pub static ref UNKNOWN_CONNECTION_EVENTS_TOTAL: Counter =
        register_counter!("spinelrpc_unknown_connection_events_total", "Total number of events for unknown connections.").unwrap();

    /// Context evictions, labeled by the trigger that caused them.
    pub static ref EVICTIONS_TOTAL: CounterVec =
        register_counter_vec!("spinelrpc_evictions_total", "Total number of evicted connection contexts, labeled by reason.", &["reason"]).unwrap();
}

/// Gathers all registered metrics and encodes them in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_else(|e| format!("# failed to encode metrics: {e}\n"))
}
