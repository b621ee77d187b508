//! Prometheus metrics for the action dispatch core.
//!
//! Installs a global Prometheus recorder using `metrics-exporter-prometheus`
//! and exposes the `/metrics` endpoint handler, grounded on the teacher's
//! metrics module. Trimmed to what `SPEC_FULL.md` §2.4 calls for: actions
//! dispatched/completed and per-step backend outcomes, rather than the
//! full S3-surface HTTP RED metrics the teacher instruments.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

/// Total actions dispatched (counter). Labels: action.
pub const ACTIONS_DISPATCHED_TOTAL: &str = "gatekv_actions_dispatched_total";

/// Total actions that reached a terminal response (counter). Labels: action, outcome.
pub const ACTIONS_COMPLETED_TOTAL: &str = "gatekv_actions_completed_total";

/// Total backend port calls by outcome (counter). Labels: port, outcome.
pub const BACKEND_CALLS_TOTAL: &str = "gatekv_backend_calls_total";

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus metrics recorder. Idempotent.
pub fn init_metrics() -> &'static PrometheusHandle {
    PROMETHEUS_HANDLE.get_or_init(|| {
        PrometheusBuilder::new()
            .install_recorder()
            .expect("failed to install Prometheus recorder")
    })
}

/// Register metric descriptions with the global recorder.
pub fn describe_metrics() {
    describe_counter!(ACTIONS_DISPATCHED_TOTAL, "Total actions dispatched by verb");
    describe_counter!(ACTIONS_COMPLETED_TOTAL, "Total actions completed by verb and outcome");
    describe_counter!(BACKEND_CALLS_TOTAL, "Total backend port calls by port and outcome");
}

/// Record that an action of `verb` was dispatched.
pub fn record_dispatched(verb: &'static str) {
    counter!(ACTIONS_DISPATCHED_TOTAL, "action" => verb).increment(1);
}

/// Record an action's terminal outcome.
pub fn record_completed(verb: &'static str, outcome: &'static str) {
    counter!(ACTIONS_COMPLETED_TOTAL, "action" => verb, "outcome" => outcome).increment(1);
}

/// Record one backend port call's outcome.
pub fn record_backend_call(port: &'static str, outcome: &'static str) {
    counter!(BACKEND_CALLS_TOTAL, "port" => port, "outcome" => outcome).increment(1);
}

/// `GET /metrics` -- render Prometheus exposition format text.
pub async fn metrics_handler() -> impl IntoResponse {
    let handle = PROMETHEUS_HANDLE
        .get()
        .expect("Prometheus recorder not initialized");
    let body = handle.render();
    (StatusCode::OK, [("content-type", "text/plain; version=0.0.4")], body)
}

/// `GET /healthz` -- liveness probe. Confirms the process is running.
pub async fn healthz_handler() -> impl IntoResponse {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_constants_are_namespaced() {
        assert_eq!(ACTIONS_DISPATCHED_TOTAL, "gatekv_actions_dispatched_total");
        assert_eq!(ACTIONS_COMPLETED_TOTAL, "gatekv_actions_completed_total");
        assert_eq!(BACKEND_CALLS_TOTAL, "gatekv_backend_calls_total");
    }
}
