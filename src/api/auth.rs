/// Login, registration and current-session endpoints
use crate::{
    account::{AuthResponse, LoginRequest, PublicUser, RegisterRequest},
    api::{ApiJson, UserEnvelope},
    auth::AuthContext,
    context::AppContext,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

/// Build auth routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/me", get(me))
}

/// `POST /api/auth/login`
async fn login(
    State(ctx): State<AppContext>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let (user, token) = ctx.account_manager.login(&req.email, &req.password).await?;
    tracing::debug!("login: {} signed in", user.id);

    Ok(Json(AuthResponse {
        user: PublicUser::from(user),
        token,
    }))
}

/// `POST /api/auth/register`
async fn register(
    State(ctx): State<AppContext>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let invite_token = req
        .invite_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let invitation = match invite_token {
        Some(token) => Some(
            ctx.invite_manager
                .validate_for_registration(token, &req.email)
                .await?,
        ),
        None => {
            // The first account bootstraps the community without an invitation
            if ctx.config.invites.required && ctx.account_manager.user_count().await? > 0 {
                return Err(ApiError::Validation(
                    "An invitation is required to register".to_string(),
                ));
            }
            None
        }
    };

    let user = ctx.account_manager.create_account(&req).await?;

    if let Some(invitation) = invitation {
        if let Err(e) = ctx.invite_manager.mark_accepted(&invitation.id).await {
            tracing::warn!(
                "register: account {} created but invitation {} not marked accepted: {}",
                user.id,
                invitation.id,
                e
            );
        }
    }

    let token = ctx.account_manager.issue_token(&user)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: PublicUser::from(user),
            token,
        }),
    ))
}

/// `GET /api/auth/me`
async fn me(auth: AuthContext) -> Json<UserEnvelope> {
    Json(UserEnvelope {
        user: PublicUser::from(auth.user),
    })
}
