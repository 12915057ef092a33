/// Project showcase endpoints
use crate::{
    api::{
        ApiJson, ApiPath, ApiQuery, IdQuery, ProjectEnvelope, ProjectsEnvelope, SuccessResponse,
    },
    auth::AuthContext,
    context::AppContext,
    error::ApiResult,
    showcase::{CreateProjectRequest, ProjectFilter, UpdateProjectRequest},
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Build project routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/api/projects",
            get(list_projects)
                .post(create_project)
                .put(update_project)
                .delete(delete_project),
        )
        .route("/api/projects/:id/like", post(toggle_like))
}

/// `GET /api/projects[?gradeLevel=&designCyclePhase=]`, or one project with `?id=`
async fn list_projects(
    State(ctx): State<AppContext>,
    ApiQuery(query): ApiQuery<IdQuery>,
    ApiQuery(filter): ApiQuery<ProjectFilter>,
) -> ApiResult<Response> {
    if let Some(id) = query.id {
        let project = ctx.project_manager.get(&id).await?;
        return Ok(Json(ProjectEnvelope { project }).into_response());
    }

    let projects = ctx.project_manager.list(&filter).await?;
    Ok(Json(ProjectsEnvelope { projects }).into_response())
}

async fn create_project(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    ApiJson(req): ApiJson<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<ProjectEnvelope>)> {
    let project = ctx.project_manager.create(&auth.user, req).await?;
    Ok((StatusCode::CREATED, Json(ProjectEnvelope { project })))
}

async fn update_project(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    ApiJson(req): ApiJson<UpdateProjectRequest>,
) -> ApiResult<Json<ProjectEnvelope>> {
    let project = ctx.project_manager.update(&auth.user, req).await?;
    Ok(Json(ProjectEnvelope { project }))
}

async fn delete_project(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<IdQuery>,
) -> ApiResult<Json<SuccessResponse>> {
    let id = query.require()?;
    ctx.project_manager.delete(&auth.user, &id).await?;
    Ok(Json(SuccessResponse::ok()))
}

async fn toggle_like(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<ProjectEnvelope>> {
    let project = ctx.project_manager.toggle_like(&id, &auth.user.id).await?;
    Ok(Json(ProjectEnvelope { project }))
}
