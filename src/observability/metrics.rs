//! Metrics collection and exposition.
//!
//! # Metrics
//! - `telemetry_requests_total` (counter): requests by route, status
//! - `telemetry_request_duration_seconds` (histogram): handler latency by route
//! - `telemetry_outbound_calls_total` (counter): retry-wrapped calls by operation, outcome
//! - `telemetry_transactions_cached` (gauge): beacon updates held per chain
//!
//! Recording is a no-op until [`init_metrics`] installs the Prometheus recorder.

use std::net::SocketAddr;
use std::time::Instant;

use ::metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::chain::ChainId;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(route: &str, status: u16, start: Instant) {
    counter!(
        "telemetry_requests_total",
        "route" => route.to_owned(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("telemetry_request_duration_seconds", "route" => route.to_owned())
        .record(start.elapsed().as_secs_f64());
}

/// `outcome` is [`crate::resilience::Outcome::label`].
pub fn record_outbound_call(operation: &'static str, outcome: &'static str) {
    counter!(
        "telemetry_outbound_calls_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_cached_transactions(chain: ChainId, count: usize) {
    gauge!("telemetry_transactions_cached", "chain_id" => chain.to_string()).set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_request("/health", 200, Instant::now());
        record_outbound_call("coin_value", "success");
        record_cached_transactions(ChainId(1), 3);
    }
}
