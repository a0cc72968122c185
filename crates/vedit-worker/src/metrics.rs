//! Prometheus metrics for the worker.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use crate::error::{WorkerError, WorkerResult};

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_STARTED_TOTAL: &str = "vedit_jobs_started_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "vedit_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "vedit_jobs_failed_total";
    pub const JOB_DURATION_SECONDS: &str = "vedit_job_duration_seconds";
    pub const JOBS_IN_FLIGHT: &str = "vedit_jobs_in_flight";
    pub const JOBS_CLAIMED_TOTAL: &str = "vedit_jobs_claimed_total";
}

/// Serve `/metrics` on `0.0.0.0:{port}`.
pub fn init_metrics(port: u16) -> WorkerResult<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| WorkerError::config_error(format!("metrics exporter: {e}")))
}

pub fn record_job_started(kind: &str) {
    counter!(names::JOBS_STARTED_TOTAL, "kind" => kind.to_string()).increment(1);
    gauge!(names::JOBS_IN_FLIGHT).increment(1.0);
}

/// `outcome` is `completed` or `error` for jobs that produced an outcome.
pub fn record_job_completed(kind: &str, outcome: &str, duration_secs: f64) {
    gauge!(names::JOBS_IN_FLIGHT).decrement(1.0);
    let labels = [("kind", kind.to_string()), ("outcome", outcome.to_string())];
    counter!(names::JOBS_COMPLETED_TOTAL, &labels).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_job_failed(kind: &str, duration_secs: f64) {
    gauge!(names::JOBS_IN_FLIGHT).decrement(1.0);
    let labels = [("kind", kind.to_string()), ("outcome", "failure".to_string())];
    counter!(names::JOBS_FAILED_TOTAL, "kind" => kind.to_string()).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_jobs_claimed(count: usize) {
    counter!(names::JOBS_CLAIMED_TOTAL).increment(count as u64);
}
