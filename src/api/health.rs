/// Health check endpoints for liveness and readiness probes
///
/// - Liveness: the process is up and answering requests
/// - Readiness: the document store accepts writes, so traffic can be served
use crate::{context::AppContext, error::ApiResult};
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Health status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Overall status: "healthy", "degraded", or "unhealthy"
    pub status: String,

    pub version: String,

    pub uptime_seconds: i64,

    pub checks: Vec<ComponentHealth>,
}

/// Health status of individual component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,

    /// Status: "healthy", "degraded", or "unhealthy"
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
}

/// Basic health check
pub async fn health_basic(State(ctx): State<AppContext>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": ctx.config.service.version,
    }))
}

/// Liveness probe. If we can respond, we're alive.
pub async fn liveness_probe() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness probe - 503 while the document store cannot be written
pub async fn readiness_probe(
    State(ctx): State<AppContext>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if let Err(e) = check_storage(&ctx).await {
        tracing::warn!(error = %e, "readiness_probe_failed: storage check failed");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(serde_json::json!({
        "status": "ready",
        "version": env!("CARGO_PKG_VERSION")
    })))
}

/// Detailed health check with all component statuses
pub async fn health_detailed(State(ctx): State<AppContext>) -> (StatusCode, Json<HealthStatus>) {
    let checks = vec![
        check_storage_detailed(&ctx).await,
        check_community_detailed(&ctx).await,
        check_mailer_detailed(&ctx),
    ];

    let status = determine_overall_status(&checks);
    let status_code = if status == "unhealthy" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    let health = HealthStatus {
        status,
        version: ctx.config.service.version.clone(),
        uptime_seconds: (Utc::now() - ctx.started_at).num_seconds(),
        checks,
    };

    (status_code, Json(health))
}

async fn check_storage(ctx: &AppContext) -> ApiResult<()> {
    ctx.documents.health_check().await
}

async fn check_storage_detailed(ctx: &AppContext) -> ComponentHealth {
    let start = Instant::now();
    let result = check_storage(ctx).await;

    ComponentHealth {
        name: "storage".to_string(),
        status: if result.is_ok() { "healthy" } else { "unhealthy" }.to_string(),
        response_time_ms: Some(start.elapsed().as_millis() as u64),
        error: result.err().map(|e| e.to_string()),
        details: Some(serde_json::json!({ "backend": ctx.documents.describe() })),
    }
}

/// Counts prove every document still parses
async fn check_community_detailed(ctx: &AppContext) -> ComponentHealth {
    let start = Instant::now();
    let counts = async {
        Ok::<_, crate::error::ApiError>(serde_json::json!({
            "users": ctx.account_manager.user_count().await?,
            "pendingInvitations": ctx.invite_manager.pending_count().await?,
        }))
    }
    .await;

    match counts {
        Ok(details) => ComponentHealth {
            name: "documents".to_string(),
            status: "healthy".to_string(),
            response_time_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
            details: Some(details),
        },
        Err(e) => ComponentHealth {
            name: "documents".to_string(),
            status: "unhealthy".to_string(),
            response_time_ms: Some(start.elapsed().as_millis() as u64),
            error: Some(e.to_string()),
            details: None,
        },
    }
}

fn check_mailer_detailed(ctx: &AppContext) -> ComponentHealth {
    let configured = ctx.mailer.is_configured();
    ComponentHealth {
        name: "mailer".to_string(),
        // Invitations still work without mail, links are shared by hand
        status: if configured { "healthy" } else { "degraded" }.to_string(),
        response_time_ms: None,
        error: None,
        details: Some(serde_json::json!({ "configured": configured })),
    }
}

fn determine_overall_status(checks: &[ComponentHealth]) -> String {
    if checks.iter().any(|c| c.status == "unhealthy") {
        "unhealthy".to_string()
    } else if checks.iter().any(|c| c.status == "degraded") {
        "degraded".to_string()
    } else {
        "healthy".to_string()
    }
}
