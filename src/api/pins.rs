/// Pin board endpoints
use crate::{
    api::{ApiJson, ApiPath, ApiQuery, IdQuery, PinEnvelope, PinsEnvelope, SuccessResponse},
    auth::AuthContext,
    board::{CreatePinRequest, UpdatePinRequest},
    context::AppContext,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Build pin routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/api/pins",
            get(list_pins)
                .post(create_pin)
                .put(update_pin)
                .delete(delete_pin),
        )
        .route("/api/pins/:id/like", post(toggle_like))
}

/// Quoted entity tag for a document hash
fn quoted_etag(etag: &str) -> String {
    format!("\"{}\"", etag)
}

/// Whether an `If-None-Match` header names the current tag
fn etag_matches(headers: &HeaderMap, etag: &str) -> bool {
    let Some(value) = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };

    value.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || candidate.trim_start_matches("W/").trim_matches('"') == etag
    })
}

/// `GET /api/pins` - every pin, bottom-most first.
///
/// Polling clients send back the last `ETag` and get an empty 304 when
/// nothing changed.
async fn list_pins(State(ctx): State<AppContext>, headers: HeaderMap) -> ApiResult<Response> {
    let snapshot = ctx.pin_manager.list().await?;
    let etag = HeaderValue::from_str(&quoted_etag(&snapshot.etag))
        .map_err(|e| ApiError::Internal(format!("Bad entity tag: {}", e)))?;

    let mut response = if etag_matches(&headers, &snapshot.etag) {
        StatusCode::NOT_MODIFIED.into_response()
    } else {
        Json(PinsEnvelope {
            pins: snapshot.records,
        })
        .into_response()
    };

    let response_headers = response.headers_mut();
    response_headers.insert(header::ETAG, etag);
    response_headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    Ok(response)
}

/// `POST /api/pins`
async fn create_pin(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    ApiJson(req): ApiJson<CreatePinRequest>,
) -> ApiResult<(StatusCode, Json<PinEnvelope>)> {
    let pin = ctx.pin_manager.create(&auth.user, req).await?;
    Ok((StatusCode::CREATED, Json(PinEnvelope { pin })))
}

/// `PUT /api/pins`
async fn update_pin(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    ApiJson(req): ApiJson<UpdatePinRequest>,
) -> ApiResult<Json<PinEnvelope>> {
    let pin = ctx.pin_manager.update(&auth.user, req).await?;
    Ok(Json(PinEnvelope { pin }))
}

/// `DELETE /api/pins?id=`
async fn delete_pin(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<IdQuery>,
) -> ApiResult<Json<SuccessResponse>> {
    let id = query.require()?;
    ctx.pin_manager.delete(&auth.user, &id).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// `POST /api/pins/:id/like`
async fn toggle_like(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<PinEnvelope>> {
    let pin = ctx.pin_manager.toggle_like(&id, &auth.user.id).await?;
    Ok(Json(PinEnvelope { pin }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_etag_matching() {
        let mut headers = HeaderMap::new();
        assert!(!etag_matches(&headers, "abc"));

        headers.insert(header::IF_NONE_MATCH, HeaderValue::from_static("\"abc\""));
        assert!(etag_matches(&headers, "abc"));
        assert!(!etag_matches(&headers, "def"));

        headers.insert(header::IF_NONE_MATCH, HeaderValue::from_static("W/\"x\", \"def\""));
        assert!(etag_matches(&headers, "def"));
    }
}
