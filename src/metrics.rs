// src/metrics.rs

#[cfg(feature = "observability")]
pub use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

// NOTE: When observability feature is disabled, provide stub implementations
#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! counter {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
    ($name:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! histogram {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_counter {
    ($name:expr, $unit:expr, $desc:expr) => {};
    ($name:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_histogram {
    ($name:expr, $unit:expr, $desc:expr) => {};
    ($name:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
use crate::{counter, describe_counter, describe_histogram, histogram};

use std::time::Duration;

/// Registers descriptions for every metric. Call once at startup.
pub fn describe_metrics() {
    describe_counter!("rpc_calls_total", "Node RPC calls by method.");
    describe_histogram!("rpc_call_latency_ms", "Node RPC call latency in milliseconds.");
    describe_counter!("nonce_fetches_total", "Pending transaction count fetches.");
    describe_counter!("tx_submitted_total", "Signed transactions accepted by the node.");
    describe_counter!("tx_stale_nonce_retries_total", "Resubmissions after a stale nonce.");
    describe_counter!("tx_outcomes_total", "Terminal transaction outcomes by kind.");
    describe_histogram!(
        "tx_confirmation_latency_ms",
        "Time from submission to receipt in milliseconds."
    );
    describe_counter!("bindings_generated_total", "Function bindings generated per project.");
}

/// Serves `/metrics` for Prometheus on `addr`.
#[cfg(feature = "observability")]
pub fn install_prometheus_exporter(addr: std::net::SocketAddr) -> anyhow::Result<()> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    describe_metrics();
    Ok(())
}

pub fn increment_rpc_call(method: &str) {
    counter!("rpc_calls_total", 1, "method" => method.to_string());
}

pub fn record_rpc_call_latency(method: &str, duration: Duration) {
    histogram!("rpc_call_latency_ms", duration.as_millis() as f64,
               "method" => method.to_string());
}

pub fn increment_nonce_fetch(endpoint: &str) {
    counter!("nonce_fetches_total", 1, "endpoint" => endpoint.to_string());
}

pub fn increment_tx_submitted(endpoint: &str) {
    counter!("tx_submitted_total", 1, "endpoint" => endpoint.to_string());
}

pub fn increment_stale_nonce_retry(endpoint: &str) {
    counter!("tx_stale_nonce_retries_total", 1, "endpoint" => endpoint.to_string());
}

pub fn increment_tx_outcome(endpoint: &str, outcome: &str) {
    counter!("tx_outcomes_total", 1,
             "endpoint" => endpoint.to_string(),
             "outcome" => outcome.to_string());
}

pub fn record_confirmation_latency(endpoint: &str, duration: Duration) {
    histogram!("tx_confirmation_latency_ms", duration.as_millis() as f64,
               "endpoint" => endpoint.to_string());
}

pub fn increment_bindings_generated(project: &str, count: usize) {
    counter!("bindings_generated_total", count as u64, "project" => project.to_string());
}
