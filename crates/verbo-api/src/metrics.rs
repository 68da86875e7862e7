//! Prometheus metrics for request traffic and grading outcomes.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use regex::Regex;
use std::{sync::LazyLock, time::Instant};
use verbo_srs::GradeOutcome;

static UUID_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .unwrap_or_else(|err| unreachable!("uuid pattern: {err}"))
});

/// Item ids and mastery topics are free text
static FREE_SEGMENTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/(items|mastery)/[^/]+(?:/[^/]+/[^/]+)?")
        .unwrap_or_else(|err| unreachable!("segment pattern: {err}"))
});

/// Initialize Prometheus metrics exporter
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let builder = PrometheusBuilder::new();

    // Request duration buckets, in seconds
    let builder = builder.set_buckets_for_metric(
        Matcher::Full("http_request_duration_seconds".to_string()),
        &[
            0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ],
    )?;

    let handle = builder.install_recorder()?;

    Ok(handle)
}

/// Middleware to record HTTP request metrics
pub async fn track_metrics(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = normalize_path(req.uri().path());

    let in_flight = gauge!("http_requests_in_flight", "method" => method.clone(), "path" => path.clone());
    in_flight.increment(1.0);

    let response: Response = next.run(req).await;

    in_flight.decrement(1.0);

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(
        "http_requests_total",
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status.clone()
    )
    .increment(1);

    histogram!(
        "http_request_duration_seconds",
        "method" => method,
        "path" => path,
        "status" => status
    )
    .record(duration);

    response
}

/// Normalize URL paths to reduce cardinality in metrics
fn normalize_path(path: &str) -> String {
    let normalized = UUID_SEGMENT.replace_all(path, ":id");
    FREE_SEGMENTS
        .replace_all(&normalized, |caps: &regex::Captures<'_>| match &caps[1] {
            "items" => "/items/:item_id".to_string(),
            _ => "/mastery/:topic".to_string(),
        })
        .into_owned()
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (StatusCode::OK, handle.render())
}

pub fn record_grade(outcome: &GradeOutcome) {
    let result = if outcome.success {
        "success"
    } else {
        "failure"
    };

    counter!(
        "srs_grades_total",
        "result" => result,
        "state" => outcome.record.state.as_str()
    )
    .increment(1);

    if outcome.lapsed {
        counter!("srs_lapses_total").increment(1);
    }
}

/// Grades turned away before reaching the store, by reason.
pub fn record_grade_rejected(reason: &'static str) {
    counter!("srs_grades_rejected_total", "reason" => reason).increment(1);
}

pub fn record_store_error(kind: &'static str) {
    counter!("srs_store_errors_total", "kind" => kind).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path("/learners/550e8400-e29b-41d4-a716-446655440000/due"),
            "/learners/:id/due"
        );
        assert_eq!(
            normalize_path(
                "/learners/550e8400-e29b-41d4-a716-446655440000/items/hablar:pret:1s/attempts"
            ),
            "/learners/:id/items/:item_id/attempts"
        );
        assert_eq!(
            normalize_path(
                "/learners/550e8400-e29b-41d4-a716-446655440000/mastery/ser/present/indicative"
            ),
            "/learners/:id/mastery/:topic"
        );
        assert_eq!(
            normalize_path("/learners/550e8400-e29b-41d4-a716-446655440000/mastery"),
            "/learners/:id/mastery"
        );
        assert_eq!(normalize_path("/health"), "/health");
    }
}
