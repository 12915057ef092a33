/// Forum endpoints: topics, threads and replies
use crate::{
    api::{
        ApiJson, ApiPath, ApiQuery, IdQuery, RepliesEnvelope, ReplyEnvelope, SuccessResponse,
        ThreadEnvelope, ThreadsEnvelope, TopicsEnvelope,
    },
    auth::AuthContext,
    context::AppContext,
    error::ApiResult,
    forum::{CreateReplyRequest, CreateThreadRequest, UpdateThreadRequest},
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

/// Build forum routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/topics", get(list_topics))
        .route(
            "/api/threads",
            get(list_threads)
                .post(create_thread)
                .put(update_thread)
                .delete(delete_thread),
        )
        .route(
            "/api/threads/:id/replies",
            get(list_replies).post(create_reply).delete(delete_reply),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadQuery {
    id: Option<String>,
    topic_id: Option<String>,
}

/// `GET /api/topics`
async fn list_topics(State(ctx): State<AppContext>) -> ApiResult<Json<TopicsEnvelope>> {
    let topics = ctx.forum_manager.topics().await?;
    Ok(Json(TopicsEnvelope { topics }))
}

/// `GET /api/threads[?topicId=]` - pinned first, then newest first.
/// `?id=` returns that one thread.
async fn list_threads(
    State(ctx): State<AppContext>,
    ApiQuery(query): ApiQuery<ThreadQuery>,
) -> ApiResult<Response> {
    if let Some(id) = query.id {
        let thread = ctx.forum_manager.get_thread(&id).await?;
        return Ok(Json(ThreadEnvelope { thread }).into_response());
    }

    let threads = ctx
        .forum_manager
        .list_threads(query.topic_id.as_deref())
        .await?;
    Ok(Json(ThreadsEnvelope { threads }).into_response())
}

async fn create_thread(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    ApiJson(req): ApiJson<CreateThreadRequest>,
) -> ApiResult<(StatusCode, Json<ThreadEnvelope>)> {
    let thread = ctx.forum_manager.create_thread(&auth.user, req).await?;
    Ok((StatusCode::CREATED, Json(ThreadEnvelope { thread })))
}

async fn update_thread(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    ApiJson(req): ApiJson<UpdateThreadRequest>,
) -> ApiResult<Json<ThreadEnvelope>> {
    let thread = ctx.forum_manager.update_thread(&auth.user, req).await?;
    Ok(Json(ThreadEnvelope { thread }))
}

async fn delete_thread(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<IdQuery>,
) -> ApiResult<Json<SuccessResponse>> {
    let id = query.require()?;
    ctx.forum_manager.delete_thread(&auth.user, &id).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// `GET /api/threads/:id/replies` - oldest first
async fn list_replies(
    State(ctx): State<AppContext>,
    ApiPath(thread_id): ApiPath<String>,
) -> ApiResult<Json<RepliesEnvelope>> {
    let replies = ctx.forum_manager.list_replies(&thread_id).await?;
    Ok(Json(RepliesEnvelope { replies }))
}

async fn create_reply(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    ApiPath(thread_id): ApiPath<String>,
    ApiJson(req): ApiJson<CreateReplyRequest>,
) -> ApiResult<(StatusCode, Json<ReplyEnvelope>)> {
    let reply = ctx
        .forum_manager
        .create_reply(&auth.user, &thread_id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(ReplyEnvelope { reply })))
}

/// `DELETE /api/threads/:id/replies?id=`
async fn delete_reply(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    ApiPath(thread_id): ApiPath<String>,
    ApiQuery(query): ApiQuery<IdQuery>,
) -> ApiResult<Json<SuccessResponse>> {
    let reply_id = query.require()?;
    ctx.forum_manager
        .delete_reply(&auth.user, &thread_id, &reply_id)
        .await?;
    Ok(Json(SuccessResponse::ok()))
}
