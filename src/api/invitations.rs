/// Invitation endpoints
use crate::{
    api::{ApiJson, ApiQuery, InvitationEnvelope, InvitationsEnvelope},
    auth::{AdminAuthContext, OptionalAuthContext},
    context::AppContext,
    error::{ApiError, ApiResult},
    invites::{CreateInvitationRequest, UpdateInvitationRequest},
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

/// Build invitation routes
pub fn routes() -> Router<AppContext> {
    Router::new().route(
        "/api/invitations",
        get(list_invitations)
            .post(create_invitation)
            .put(update_invitation),
    )
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// `GET /api/invitations[?token=]`
///
/// With a token anyone may look up that one invitation (the registration
/// page does this); the full list is for admins.
async fn list_invitations(
    State(ctx): State<AppContext>,
    auth: OptionalAuthContext,
    ApiQuery(query): ApiQuery<TokenQuery>,
) -> ApiResult<Response> {
    if let Some(token) = query.token.filter(|t| !t.is_empty()) {
        let invitation = ctx.invite_manager.find_by_token(&token).await?;
        return Ok(Json(InvitationEnvelope { invitation }).into_response());
    }

    match auth.auth {
        Some(auth) if auth.user.is_admin() => {
            let invitations = ctx.invite_manager.list().await?;
            Ok(Json(InvitationsEnvelope { invitations }).into_response())
        }
        Some(_) => Err(ApiError::Authorization("Admin role required".to_string())),
        None => Err(ApiError::Authentication("Sign in required".to_string())),
    }
}

/// `POST /api/invitations`
async fn create_invitation(
    State(ctx): State<AppContext>,
    admin: AdminAuthContext,
    ApiJson(req): ApiJson<CreateInvitationRequest>,
) -> ApiResult<(StatusCode, Json<InvitationEnvelope>)> {
    if ctx.account_manager.find_by_email(&req.email).await?.is_some() {
        return Err(ApiError::Conflict(
            "A member with this email already exists".to_string(),
        ));
    }

    let invitation = ctx.invite_manager.create(&admin.user, req).await?;

    // The invitation stands even if the email cannot be delivered
    if let Err(e) = ctx
        .mailer
        .send_invitation_email(&invitation, &admin.user.display_name, &ctx.service_url())
        .await
    {
        tracing::warn!("Failed to send invitation email to {}: {}", invitation.email, e);
    }

    Ok((StatusCode::CREATED, Json(InvitationEnvelope { invitation })))
}

/// `PUT /api/invitations {id|token, status}`
async fn update_invitation(
    State(ctx): State<AppContext>,
    _admin: AdminAuthContext,
    ApiJson(req): ApiJson<UpdateInvitationRequest>,
) -> ApiResult<Json<InvitationEnvelope>> {
    let invitation = ctx.invite_manager.update(req).await?;
    Ok(Json(InvitationEnvelope { invitation }))
}
