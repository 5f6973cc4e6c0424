//! Metrics collection and exposition.
//!
//! # Metrics
//! - `paylog_operation_duration_seconds` (histogram): wrapped-operation latency by operation, status
//! - `paylog_operation_slow_total` (counter): threshold overruns by operation, status
//!
//! Recording is a no-op until a recorder is installed, so library users
//! that never call [`init_metrics`] pay nothing.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const OPERATION_DURATION: &str = "paylog_operation_duration_seconds";
pub const OPERATION_SLOW: &str = "paylog_operation_slow_total";

/// Install the Prometheus recorder with a scrape endpoint on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_operation(operation: &str, status: &'static str, elapsed: Duration) {
    metrics::histogram!(
        OPERATION_DURATION,
        "operation" => operation.to_string(),
        "status" => status
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_slow(operation: &str, status: &'static str) {
    metrics::counter!(
        OPERATION_SLOW,
        "operation" => operation.to_string(),
        "status" => status
    )
    .increment(1);
}
