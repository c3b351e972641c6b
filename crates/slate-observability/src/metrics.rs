use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
    routing::get,
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::{Duration, Instant};
use tracing::error;

use crate::is_observability_enabled;

/// Installs the Prometheus recorder and its upkeep task.
///
/// Returns `None` when observability is disabled or the recorder could not
/// be installed.
pub fn init_metrics() -> Option<PrometheusHandle> {
    if !is_observability_enabled() {
        return None;
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        )
        .and_then(|builder| builder.install_recorder())
        .inspect_err(|e| error!(error = %e, "Failed to install Prometheus recorder"))
        .ok()?;

    let upkeep_handle = handle.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(5)).await;
            upkeep_handle.run_upkeep();
        }
    });

    Some(handle)
}

pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    if !is_observability_enabled() {
        return next.run(req).await;
    }

    let start = Instant::now();
    let method = req.method().as_str().to_owned();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());

    gauge!("http_requests_active").increment(1.0);

    let response = next.run(req).await;

    let latency = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!("http_requests_total", "method" => method.clone(), "path" => path.clone(), "status" => status)
        .increment(1);
    histogram!("http_request_duration_seconds", "method" => method, "path" => path).record(latency);
    gauge!("http_requests_active").decrement(1.0);

    response
}

/// `GET /metrics` in Prometheus text format.
pub fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", get(move || async move { handle.render() }))
}

// Business metrics

pub fn track_authorization_check(role: &str, outcome: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("authorization_checks_total", "role" => role.to_string(), "outcome" => outcome.to_string())
        .increment(1);
}

pub fn track_enrollment(outcome: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("enrollments_total", "outcome" => outcome.to_string()).increment(1);
}

pub fn track_audit_write_failure(action: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("audit_write_failures_total", "action" => action.to_string()).increment(1);
}

pub fn track_task_submit_failure(job: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("task_submit_failures_total", "job" => job.to_string()).increment(1);
}
