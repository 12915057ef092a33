/// Member directory and profile endpoints
use crate::{
    account::{PublicUser, UpdateUserRequest},
    api::{ApiJson, ApiQuery, IdQuery, UserEnvelope, UsersEnvelope},
    auth::AuthContext,
    context::AppContext,
    error::ApiResult,
};
use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

/// Build user routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/users", get(list_users).put(update_user))
}

/// `GET /api/users[?id=]` - the directory, or one member
async fn list_users(
    State(ctx): State<AppContext>,
    ApiQuery(query): ApiQuery<IdQuery>,
) -> ApiResult<Response> {
    if let Some(id) = query.id {
        let user = ctx.account_manager.get_user(&id).await?;
        return Ok(Json(UserEnvelope {
            user: PublicUser::from(user),
        })
        .into_response());
    }

    let users = ctx
        .account_manager
        .list_users()
        .await?
        .iter()
        .map(PublicUser::from)
        .collect();

    Ok(Json(UsersEnvelope { users }).into_response())
}

/// `PUT /api/users`
async fn update_user(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> ApiResult<Json<UserEnvelope>> {
    let user = ctx.account_manager.update_user(&auth.user, req).await?;
    Ok(Json(UserEnvelope {
        user: PublicUser::from(user),
    }))
}
