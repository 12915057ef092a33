/// API routes and handlers
pub mod auth;
pub mod extract;
pub mod health;
pub mod invitations;
pub mod pins;
pub mod projects;
pub mod threads;
pub mod users;

use crate::{
    account::PublicUser,
    board::Pin,
    context::AppContext,
    error::{ApiError, ApiResult},
    forum::{Reply, Thread, TopicSummary},
    invites::Invitation,
    showcase::Project,
};
use axum::Router;
pub use extract::{ApiJson, ApiPath, ApiQuery};
use serde::{Deserialize, Serialize};

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(users::routes())
        .merge(pins::routes())
        .merge(projects::routes())
        .merge(threads::routes())
        .merge(invitations::routes())
}

/// `?id=` query used by lookups and deletes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

impl IdQuery {
    /// The id, or a 400 when it is missing
    pub fn require(self) -> ApiResult<String> {
        self.id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ApiError::Validation("id is required".to_string()))
    }
}

/// Body of a successful delete
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEnvelope {
    pub user: PublicUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsersEnvelope {
    pub users: Vec<PublicUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinEnvelope {
    pub pin: Pin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinsEnvelope {
    pub pins: Vec<Pin>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectEnvelope {
    pub project: Project,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectsEnvelope {
    pub projects: Vec<Project>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadEnvelope {
    pub thread: Thread,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadsEnvelope {
    pub threads: Vec<Thread>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicsEnvelope {
    pub topics: Vec<TopicSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyEnvelope {
    pub reply: Reply,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepliesEnvelope {
    pub replies: Vec<Reply>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationEnvelope {
    pub invitation: Invitation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationsEnvelope {
    pub invitations: Vec<Invitation>,
}
