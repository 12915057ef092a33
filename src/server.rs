/// HTTP server setup and routing
use crate::{
    context::AppContext,
    error::{ApiError, ApiResult, ErrorResponse},
    metrics,
    rate_limit::rate_limit_middleware,
};
use axum::{
    extract::{Request, State},
    http::{header, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use tower::ServiceExt;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::info;

/// Build the main application router
/// Returns Router<()> because state is already provided
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::IF_NONE_MATCH,
        ])
        .expose_headers([header::ETAG]);

    Router::new()
        .route("/metrics", get(metrics::metrics_handler))
        .merge(crate::api::routes())
        .fallback(fallback)
        // Provide state - converts Router<AppContext> to Router<()>
        .with_state(ctx.clone())
        .layer(middleware::from_fn_with_state(ctx, rate_limit_middleware))
        .layer(middleware::from_fn(metrics::track_metrics))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// Unknown API paths get a JSON 404; anything else is handed to the static
/// frontend when one is configured, with `index.html` for client-side routes.
async fn fallback(State(ctx): State<AppContext>, request: Request) -> Response {
    let path = request.uri().path();
    let is_api = path.starts_with("/api/") || path == "/api";

    match (&ctx.config.service.static_dir, is_api) {
        (Some(dir), false) => {
            let index = ServeFile::new(dir.join("index.html"));
            match ServeDir::new(dir).fallback(index).oneshot(request).await {
                Ok(response) => response.into_response(),
                Err(never) => match never {},
            }
        }
        _ => not_found().await.into_response(),
    }
}

/// 404 handler
async fn not_found() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "Endpoint not found".to_string(),
        }),
    )
}

/// Start the HTTP server
pub async fn serve(ctx: AppContext) -> ApiResult<()> {
    let addr = format!("{}:{}", ctx.config.service.hostname, ctx.config.service.port);

    info!("Design Commons listening on {}", addr);
    info!("   Service URL: {}", ctx.service_url());
    info!("   Documents:   {}", ctx.documents.describe());
    if let Some(dir) = &ctx.config.service.static_dir {
        info!("   Frontend:    {}", dir.display());
    }

    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::ServerConfig, store::MemoryDocumentBackend};
    use axum::body::{to_bytes, Body};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn router(static_dir: Option<std::path::PathBuf>) -> Router {
        let mut config = ServerConfig::ephemeral("/tmp/unused");
        config.service.static_dir = static_dir;
        let ctx = AppContext::with_backend(config, Arc::new(MemoryDocumentBackend::new())).unwrap();
        build_router(ctx)
    }

    #[tokio::test]
    async fn test_unknown_api_path_is_json_404() {
        let response = router(None)
            .oneshot(Request::builder().uri("/api/nothing").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Endpoint not found");
    }

    #[tokio::test]
    async fn test_static_frontend_fallback() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("index.html"), "<h1>Design Commons</h1>").unwrap();

        let app = router(Some(temp_dir.path().to_path_buf()));

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/board").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("Design Commons"));

        let response = app
            .oneshot(Request::builder().uri("/api/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let response = router(None)
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
