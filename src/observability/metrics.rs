//! Metrics collection and exposition.
//!
//! # Metrics
//! - `httpapi_calls_total` (counter): calls by contract, method, outcome
//! - `httpapi_call_duration_seconds` (histogram): latency distribution
//! - `httpapi_retries_total` (counter): retry attempts by contract, method
//! - `httpapi_cache_total` (counter): cache lookups by result (hit/miss)
//! - `httpapi_admission_rejected_total` (counter): calls refused by the
//!   connection limit, by destination
//! - `httpapi_clients_disposed_total` (counter)
//!
//! Recording is a no-op until a recorder is installed (see [`init_metrics`]).

use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
    {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished call.
pub fn record_call(contract: &'static str, method: &'static str, outcome: &'static str, start: Instant) {
    ::metrics::counter!(
        "httpapi_calls_total",
        "contract" => contract,
        "method" => method,
        "outcome" => outcome
    )
    .increment(1);
    ::metrics::histogram!(
        "httpapi_call_duration_seconds",
        "contract" => contract,
        "method" => method
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record one retry attempt.
pub fn record_retry(contract: &'static str, method: &'static str) {
    ::metrics::counter!("httpapi_retries_total", "contract" => contract, "method" => method).increment(1);
}

/// Record a cache lookup.
pub fn record_cache(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    ::metrics::counter!("httpapi_cache_total", "result" => result).increment(1);
}

/// Record a call refused by admission control.
pub fn record_admission_rejected(destination: &str) {
    ::metrics::counter!(
        "httpapi_admission_rejected_total",
        "destination" => destination.to_string()
    )
    .increment(1);
}

/// Record a client disposal.
pub fn record_disposed() {
    ::metrics::counter!("httpapi_clients_disposed_total").increment(1);
}
