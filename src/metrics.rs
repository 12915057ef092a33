/// Metrics and telemetry for the Design Commons server
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - HTTP request counts and latencies
/// - JSON document write times
/// - Background job execution
/// - Board, account and invitation activity

use axum::{
    extract::{MatchedPath, Request},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};
use std::time::Instant;

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    /// Active HTTP requests
    pub static ref HTTP_REQUESTS_ACTIVE: IntGauge = register_int_gauge!(
        "http_requests_active",
        "Number of HTTP requests currently being processed"
    )
    .unwrap();

    // ========== Storage Metrics ==========

    /// Document writes by document name
    pub static ref DOCUMENT_WRITES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "document_writes_total",
        "Total number of JSON document rewrites",
        &["document"]
    )
    .unwrap();

    /// Document write duration in seconds
    pub static ref DOCUMENT_WRITE_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "document_write_duration_seconds",
        "JSON document rewrite latencies in seconds",
        &["document"],
        vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .unwrap();

    // ========== Background Job Metrics ==========

    /// Background job executions by job type and status
    pub static ref BACKGROUND_JOBS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "background_jobs_total",
        "Total number of background job executions",
        &["job_type", "status"]
    )
    .unwrap();

    /// Background job duration in seconds
    pub static ref BACKGROUND_JOB_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "background_job_duration_seconds",
        "Background job execution time in seconds",
        &["job_type"],
        vec![0.01, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]
    )
    .unwrap();

    // ========== Community Metrics ==========

    /// Accounts created by assigned role
    pub static ref ACCOUNTS_CREATED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "accounts_created_total",
        "Total number of registered accounts",
        &["role"]
    )
    .unwrap();

    /// Pin board mutations by action
    pub static ref PIN_EVENTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "pin_events_total",
        "Total number of pin board mutations",
        &["action"]
    )
    .unwrap();

    /// Invitation status changes by resulting status
    pub static ref INVITATION_TRANSITIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "invitation_transitions_total",
        "Total number of invitation status changes",
        &["status"]
    )
    .unwrap();
}

/// Render all registered metrics in the Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    let status = status.to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, status.as_str()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

/// Record a document rewrite
pub fn record_document_write(document: &str, duration: f64) {
    DOCUMENT_WRITES_TOTAL.with_label_values(&[document]).inc();
    DOCUMENT_WRITE_DURATION_SECONDS
        .with_label_values(&[document])
        .observe(duration);
}

/// Record a background job execution
pub fn record_background_job(job_type: &str, status: &str, duration: f64) {
    BACKGROUND_JOBS_TOTAL
        .with_label_values(&[job_type, status])
        .inc();
    BACKGROUND_JOB_DURATION_SECONDS
        .with_label_values(&[job_type])
        .observe(duration);
}

/// Record an account registration
pub fn record_account_creation(role: &str) {
    ACCOUNTS_CREATED_TOTAL.with_label_values(&[role]).inc();
}

/// Record a pin board mutation
pub fn record_pin_event(action: &str) {
    PIN_EVENTS_TOTAL.with_label_values(&[action]).inc();
}

/// Record an invitation status change
pub fn record_invitation_transition(status: &str) {
    INVITATION_TRANSITIONS_TOTAL.with_label_values(&[status]).inc();
}

/// Middleware recording request counts and latencies.
///
/// Uses the matched route template as the path label so ids don't explode
/// label cardinality.
pub async fn track_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    HTTP_REQUESTS_ACTIVE.inc();
    let response = next.run(request).await;
    HTTP_REQUESTS_ACTIVE.dec();

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}

/// `GET /metrics`
pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        render_metrics(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/api/pins", 200, 0.05);
        let metrics = render_metrics();
        assert!(metrics.contains("http_requests_total"));
        assert!(metrics.contains("http_request_duration_seconds"));
    }

    #[test]
    fn test_record_document_write() {
        record_document_write("pins", 0.001);
        let metrics = render_metrics();
        assert!(metrics.contains("document_writes_total"));
        assert!(metrics.contains("document_write_duration_seconds"));
    }

    #[test]
    fn test_record_background_job() {
        record_background_job("backup", "success", 1.5);
        let metrics = render_metrics();
        assert!(metrics.contains("background_jobs_total"));
    }

    #[test]
    fn test_community_counters() {
        record_account_creation("member");
        record_pin_event("create");
        record_invitation_transition("revoked");

        let metrics = render_metrics();
        assert!(metrics.contains("accounts_created_total"));
        assert!(metrics.contains("pin_events_total"));
        assert!(metrics.contains("invitation_transitions_total"));
    }
}
