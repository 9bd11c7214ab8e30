//! Prometheus metrics for monitoring server health and performance.
//!
//! Metrics are exposed in Prometheus text format on a dedicated listener,
//! scrape path `/metrics`. Besides the recorders below, the core library
//! emits `kv_replication_total{follower, outcome}` through the same facade,
//! one increment per replication attempt as it completes.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Initialize the Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`. A failure here
/// degrades to a warning at the call site; the server runs without metrics.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))
}

/// Record a flip by outcome (`ok`, `mismatch`, `no_card`, `second_controlled`,
/// `out_of_bounds`, `invalid_player`).
pub fn flip_total(outcome: &'static str) {
    metrics::counter!("board_flips_total", "outcome" => outcome).increment(1);
}

/// Record a watch registration.
pub fn watch_total() {
    metrics::counter!("board_watches_total").increment(1);
}

/// Record a board-wide card replacement.
pub fn replace_total() {
    metrics::counter!("board_replaces_total").increment(1);
}

/// Record a leader write by outcome (`ok`, `quorum_failed`).
pub fn write_total(outcome: &'static str) {
    metrics::counter!("kv_writes_total", "outcome" => outcome).increment(1);
}

/// Record the latency of a successful quorum write in milliseconds.
pub fn write_latency_ms(latency_ms: f64) {
    metrics::histogram!("kv_write_latency_ms").record(latency_ms);
}

/// Record one accepted replication on a follower.
pub fn replicate_intake_total() {
    metrics::counter!("kv_replicate_intake_total").increment(1);
}
