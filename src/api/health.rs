/// Health check endpoints for liveness and readiness probes
///
/// Liveness only proves the process answers. Readiness also checks the
/// database and the upload directory; the detailed report adds the
/// moderation queue depths refreshed by the background health task.
use crate::{background::tasks, context::AppContext, error::BoardResult, metrics};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Health status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// "healthy", "degraded" or "unhealthy"
    pub status: String,
    pub version: String,
    pub checks: Vec<ComponentHealth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Health status of individual component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Build health check routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health_basic))
        .route("/health/live", get(liveness_probe))
        .route("/health/ready", get(readiness_probe))
        .route("/health/detailed", get(health_detailed))
        .route("/metrics", get(metrics_endpoint))
}

pub async fn health_basic() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn liveness_probe() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// 200 when the database and upload storage answer, 503 otherwise
pub async fn readiness_probe(
    State(ctx): State<AppContext>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if let Err(e) = check_database(&ctx).await {
        tracing::warn!(error = %e, "readiness probe failed: database");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    if let Err(e) = check_upload_storage(&ctx).await {
        tracing::warn!(error = %e, "readiness probe failed: upload storage");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(serde_json::json!({
        "status": "ready",
        "version": env!("CARGO_PKG_VERSION")
    })))
}

pub async fn health_detailed(State(ctx): State<AppContext>) -> (StatusCode, Json<HealthStatus>) {
    let start = Instant::now();
    let checks = vec![
        timed("database", check_database(&ctx)).await,
        timed("upload_storage", check_upload_storage(&ctx)).await,
        check_background(&ctx).await,
    ];

    let overall_status = determine_overall_status(&checks);
    let status_code = match overall_status {
        "unhealthy" => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    tracing::info!(
        status = overall_status,
        duration_ms = start.elapsed().as_millis() as u64,
        "health check completed"
    );

    (
        status_code,
        Json(HealthStatus {
            status: overall_status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            message: (overall_status != "healthy")
                .then(|| "One or more components are unhealthy".to_string()),
            checks,
        }),
    )
}

/// Prometheus text exposition
pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render_metrics(),
    )
}

async fn check_database(ctx: &AppContext) -> BoardResult<()> {
    sqlx::query("SELECT 1").fetch_one(&ctx.db).await?;
    Ok(())
}

async fn check_upload_storage(ctx: &AppContext) -> BoardResult<()> {
    let metadata = tokio::fs::metadata(&ctx.config.storage.upload_directory).await?;
    if !metadata.is_dir() {
        return Err(crate::error::BoardError::Storage(
            "upload path is not a directory".to_string(),
        ));
    }
    Ok(())
}

async fn timed(
    name: &str,
    check: impl std::future::Future<Output = BoardResult<()>>,
) -> ComponentHealth {
    let start = Instant::now();
    let result = check.await;
    ComponentHealth {
        name: name.to_string(),
        status: if result.is_ok() { "healthy" } else { "unhealthy" }.to_string(),
        response_time_ms: Some(start.elapsed().as_millis() as u64),
        error: result.err().map(|e| e.to_string()),
        details: None,
    }
}

/// Failing background checks degrade the service but keep it serving
async fn check_background(ctx: &AppContext) -> ComponentHealth {
    let start = Instant::now();

    match tasks::health_check(ctx).await {
        Ok(depths) => ComponentHealth {
            name: "background_jobs".to_string(),
            status: "healthy".to_string(),
            response_time_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
            details: Some(serde_json::json!({
                "scheduler_enabled": ctx.config.background.enabled,
                "pending_jobs": depths.pending_jobs,
                "pending_reports": depths.pending_reports,
            })),
        },
        Err(e) => ComponentHealth {
            name: "background_jobs".to_string(),
            status: "degraded".to_string(),
            response_time_ms: Some(start.elapsed().as_millis() as u64),
            error: Some(e.to_string()),
            details: None,
        },
    }
}

fn determine_overall_status(checks: &[ComponentHealth]) -> &'static str {
    if checks.iter().any(|c| c.status == "unhealthy") {
        "unhealthy"
    } else if checks.iter().any(|c| c.status == "degraded") {
        "degraded"
    } else {
        "healthy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(status: &str) -> ComponentHealth {
        ComponentHealth {
            name: "component".to_string(),
            status: status.to_string(),
            response_time_ms: Some(1),
            error: None,
            details: None,
        }
    }

    #[test]
    fn test_determine_overall_status() {
        assert_eq!(determine_overall_status(&[check("healthy"), check("healthy")]), "healthy");
        assert_eq!(determine_overall_status(&[check("healthy"), check("degraded")]), "degraded");
        assert_eq!(
            determine_overall_status(&[check("degraded"), check("unhealthy")]),
            "unhealthy"
        );
    }
}
