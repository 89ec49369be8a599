/// Prometheus metrics for the job board
///
/// Counters cover HTTP traffic, moderation, reports, the application
/// pipeline, notification channels and background jobs. Rendered on
/// `/metrics`.
use crate::admin::audit::{AuditAction, AuditActionType};
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "board_http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "board_http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .unwrap();

    /// Requests turned away by the rate limiter, by caller class
    pub static ref RATE_LIMITED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "board_rate_limited_total",
        "Total number of rate limited requests",
        &["class"]
    )
    .unwrap();

    // ========== Moderation Metrics ==========

    pub static ref MODERATION_ACTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "board_moderation_actions_total",
        "Total number of moderation actions",
        &["action_type", "action"]
    )
    .unwrap();

    pub static ref REPORTS_SUBMITTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "board_reports_submitted_total",
        "Total number of reports submitted",
        &["target_kind", "category"]
    )
    .unwrap();

    // ========== Application Metrics ==========

    /// Application pipeline events (submitted, withdrawn, status changes)
    pub static ref APPLICATION_EVENTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "board_application_events_total",
        "Total number of application lifecycle events",
        &["event"]
    )
    .unwrap();

    // ========== Notification Metrics ==========

    pub static ref NOTIFICATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "board_notifications_total",
        "Notification channel outcomes",
        &["channel", "outcome"]
    )
    .unwrap();

    // ========== Background Job Metrics ==========

    pub static ref BACKGROUND_JOBS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "board_background_jobs_total",
        "Total number of background job executions",
        &["job_type", "status"]
    )
    .unwrap();

    pub static ref BACKGROUND_JOB_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "board_background_job_duration_seconds",
        "Background job execution time in seconds",
        &["job_type"],
        vec![0.01, 0.1, 0.5, 1.0, 5.0, 30.0, 120.0]
    )
    .unwrap();

    /// Open moderation queue, refreshed by the health check job
    pub static ref PENDING_JOBS: IntGauge = register_int_gauge!(
        "board_pending_jobs",
        "Jobs waiting for moderation"
    )
    .unwrap();

    pub static ref PENDING_REPORTS: IntGauge = register_int_gauge!(
        "board_pending_reports",
        "Reports waiting for review"
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

pub fn record_rate_limited(class: &str) {
    RATE_LIMITED_TOTAL.with_label_values(&[class]).inc();
}

/// Record a moderation action
pub fn record_moderation_action(action_type: AuditActionType, action: AuditAction) {
    MODERATION_ACTIONS_TOTAL
        .with_label_values(&[action_type.as_str(), action.as_str()])
        .inc();
}

pub fn record_report_submitted(target_kind: &str, category: &str) {
    REPORTS_SUBMITTED_TOTAL
        .with_label_values(&[target_kind, category])
        .inc();
}

pub fn record_application(event: &str) {
    APPLICATION_EVENTS_TOTAL.with_label_values(&[event]).inc();
}

/// Record one channel outcome of a dispatch
pub fn record_notification(channel: &str, outcome: &str) {
    NOTIFICATIONS_TOTAL
        .with_label_values(&[channel, outcome])
        .inc();
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

pub fn set_queue_depths(pending_jobs: i64, pending_reports: i64) {
    PENDING_JOBS.set(pending_jobs);
    PENDING_REPORTS.set(pending_reports);
}
