/// Typed client for the Design Commons REST API
///
/// `ApiClient` wraps one `reqwest::Client`, keeps the signed-in session
/// (optionally persisted through a [`SessionStore`]) and exposes one method
/// per endpoint. [`BoardSync`] builds the pin board's polling and debounced
/// drag writes on top of it.

pub mod board;
pub mod session;

pub use board::{BoardState, BoardSync, BoardSyncConfig, PinTransport};
pub use session::{SessionStore, StoredSession};

use crate::{
    account::{AuthResponse, LoginRequest, PublicUser, RegisterRequest, UpdateUserRequest},
    api::{
        InvitationEnvelope, InvitationsEnvelope, PinEnvelope, PinsEnvelope, ProjectEnvelope,
        ProjectsEnvelope, RepliesEnvelope, ReplyEnvelope, SuccessResponse, ThreadEnvelope,
        ThreadsEnvelope, UserEnvelope, UsersEnvelope,
    },
    board::{CreatePinRequest, Pin, UpdatePinRequest},
    error::ErrorResponse,
    forum::{CreateReplyRequest, CreateThreadRequest, Reply, Thread, UpdateThreadRequest},
    invites::{CreateInvitationRequest, Invitation, UpdateInvitationRequest},
    showcase::{CreateProjectRequest, Project, ProjectFilter, UpdateProjectRequest},
};
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Client-side error
#[derive(Error, Debug)]
pub enum ClientError {
    /// The server answered with a non-2xx status
    #[error("{message} ({status})")]
    Api { status: u16, message: String },

    /// Transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The call needs a signed-in user
    #[error("Not signed in")]
    NotSignedIn,

    /// Local state does not know the item
    #[error("Unknown {kind}: {id}")]
    Unknown { kind: &'static str, id: String },

    /// Session file errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// HTTP status for server-side failures
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Result of a conditional pin list fetch
#[derive(Debug, Clone, PartialEq)]
pub enum PinsFetch {
    /// The board has not changed since the given ETag
    NotModified,
    Pins { pins: Vec<Pin>, etag: Option<String> },
}

/// Forum topic with its thread count, as listed by `GET /api/topics`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub thread_count: usize,
}

#[derive(Deserialize)]
struct TopicsResponse {
    topics: Vec<TopicInfo>,
}

/// REST API client
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Arc<RwLock<Option<StoredSession>>>,
    store: Option<SessionStore>,
}

impl ApiClient {
    /// Client for the server at `base_url` (e.g. `http://localhost:3000`)
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let http = Client::builder()
            .user_agent(concat!("design-commons-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: Arc::new(RwLock::new(None)),
            store: None,
        })
    }

    /// Persist the session through `store`, restoring any saved session
    pub async fn with_session_store(mut self, store: SessionStore) -> ClientResult<Self> {
        let saved = store.load().await?;
        if let Some(session) = &saved {
            tracing::debug!("Restored session for {}", session.user.email);
        }
        self.set_session(saved);
        self.store = Some(store);
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The signed-in user, if any
    pub fn current_user(&self) -> Option<PublicUser> {
        self.read_session(|s| s.user.clone())
    }

    pub fn current_user_id(&self) -> Option<String> {
        self.read_session(|s| s.user.id.clone())
    }

    pub fn is_signed_in(&self) -> bool {
        self.read_session(|_| ()).is_some()
    }

    // ===== Auth =====

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<PublicUser> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response: AuthResponse = self
            .send(self.request(Method::POST, "/api/auth/login").json(&body))
            .await?;
        self.start_session(response).await
    }

    /// Register and sign in as the new account
    pub async fn register(&self, req: &RegisterRequest) -> ClientResult<PublicUser> {
        let response: AuthResponse = self
            .send(self.request(Method::POST, "/api/auth/register").json(req))
            .await?;
        self.start_session(response).await
    }

    /// Refresh the signed-in user from the server
    pub async fn me(&self) -> ClientResult<PublicUser> {
        self.require_session()?;
        let envelope: UserEnvelope = self.send(self.request(Method::GET, "/api/auth/me")).await?;

        let user = envelope.user;
        if let Ok(mut guard) = self.session.write() {
            if let Some(session) = guard.as_mut() {
                session.user = user.clone();
            }
        }
        self.persist_session().await?;
        Ok(user)
    }

    /// Forget the session locally (tokens are stateless on the server)
    pub async fn logout(&self) -> ClientResult<()> {
        self.set_session(None);
        if let Some(store) = &self.store {
            store.clear().await?;
        }
        Ok(())
    }

    // ===== Users =====

    pub async fn list_users(&self) -> ClientResult<Vec<PublicUser>> {
        let envelope: UsersEnvelope = self.send(self.request(Method::GET, "/api/users")).await?;
        Ok(envelope.users)
    }

    pub async fn get_user(&self, id: &str) -> ClientResult<PublicUser> {
        let envelope: UserEnvelope = self
            .send(self.request(Method::GET, "/api/users").query(&[("id", id)]))
            .await?;
        Ok(envelope.user)
    }

    pub async fn update_user(&self, req: &UpdateUserRequest) -> ClientResult<PublicUser> {
        let envelope: UserEnvelope = self
            .send(self.request(Method::PUT, "/api/users").json(req))
            .await?;

        if self.current_user_id().as_deref() == Some(envelope.user.id.as_str()) {
            if let Ok(mut guard) = self.session.write() {
                if let Some(session) = guard.as_mut() {
                    session.user = envelope.user.clone();
                }
            }
            self.persist_session().await?;
        }
        Ok(envelope.user)
    }

    // ===== Pins =====

    /// Fetch the board, sending `etag` as `If-None-Match`
    pub async fn fetch_pins(&self, etag: Option<&str>) -> ClientResult<PinsFetch> {
        let mut request = self.request(Method::GET, "/api/pins");
        if let Some(etag) = etag {
            request = request.header(header::IF_NONE_MATCH, etag);
        }

        let response = request.send().await?;
        if response.status() == StatusCode::NOT_MODIFIED {
            return Ok(PinsFetch::NotModified);
        }

        let etag = response
            .headers()
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let envelope: PinsEnvelope = Self::decode(response).await?;

        Ok(PinsFetch::Pins {
            pins: envelope.pins,
            etag,
        })
    }

    pub async fn list_pins(&self) -> ClientResult<Vec<Pin>> {
        match self.fetch_pins(None).await? {
            PinsFetch::Pins { pins, .. } => Ok(pins),
            PinsFetch::NotModified => Ok(Vec::new()),
        }
    }

    pub async fn create_pin(&self, req: &CreatePinRequest) -> ClientResult<Pin> {
        let envelope: PinEnvelope = self
            .send(self.request(Method::POST, "/api/pins").json(req))
            .await?;
        Ok(envelope.pin)
    }

    pub async fn update_pin(&self, req: &UpdatePinRequest) -> ClientResult<Pin> {
        let envelope: PinEnvelope = self
            .send(self.request(Method::PUT, "/api/pins").json(req))
            .await?;
        Ok(envelope.pin)
    }

    pub async fn toggle_pin_like(&self, id: &str) -> ClientResult<Pin> {
        let path = format!("/api/pins/{}/like", id);
        let envelope: PinEnvelope = self.send(self.request(Method::POST, &path)).await?;
        Ok(envelope.pin)
    }

    pub async fn delete_pin(&self, id: &str) -> ClientResult<()> {
        let _: SuccessResponse = self
            .send(self.request(Method::DELETE, "/api/pins").query(&[("id", id)]))
            .await?;
        Ok(())
    }

    // ===== Projects =====

    pub async fn list_projects(&self, filter: &ProjectFilter) -> ClientResult<Vec<Project>> {
        let envelope: ProjectsEnvelope = self
            .send(self.request(Method::GET, "/api/projects").query(filter))
            .await?;
        Ok(envelope.projects)
    }

    pub async fn get_project(&self, id: &str) -> ClientResult<Project> {
        let envelope: ProjectEnvelope = self
            .send(self.request(Method::GET, "/api/projects").query(&[("id", id)]))
            .await?;
        Ok(envelope.project)
    }

    pub async fn create_project(&self, req: &CreateProjectRequest) -> ClientResult<Project> {
        let envelope: ProjectEnvelope = self
            .send(self.request(Method::POST, "/api/projects").json(req))
            .await?;
        Ok(envelope.project)
    }

    pub async fn update_project(&self, req: &UpdateProjectRequest) -> ClientResult<Project> {
        let envelope: ProjectEnvelope = self
            .send(self.request(Method::PUT, "/api/projects").json(req))
            .await?;
        Ok(envelope.project)
    }

    pub async fn toggle_project_like(&self, id: &str) -> ClientResult<Project> {
        let path = format!("/api/projects/{}/like", id);
        let envelope: ProjectEnvelope = self.send(self.request(Method::POST, &path)).await?;
        Ok(envelope.project)
    }

    pub async fn delete_project(&self, id: &str) -> ClientResult<()> {
        let _: SuccessResponse = self
            .send(self.request(Method::DELETE, "/api/projects").query(&[("id", id)]))
            .await?;
        Ok(())
    }

    // ===== Forum =====

    pub async fn topics(&self) -> ClientResult<Vec<TopicInfo>> {
        let response: TopicsResponse = self.send(self.request(Method::GET, "/api/topics")).await?;
        Ok(response.topics)
    }

    pub async fn list_threads(&self, topic_id: Option<&str>) -> ClientResult<Vec<Thread>> {
        let mut request = self.request(Method::GET, "/api/threads");
        if let Some(topic_id) = topic_id {
            request = request.query(&[("topicId", topic_id)]);
        }
        let envelope: ThreadsEnvelope = self.send(request).await?;
        Ok(envelope.threads)
    }

    pub async fn get_thread(&self, id: &str) -> ClientResult<Thread> {
        let envelope: ThreadEnvelope = self
            .send(self.request(Method::GET, "/api/threads").query(&[("id", id)]))
            .await?;
        Ok(envelope.thread)
    }

    pub async fn create_thread(&self, req: &CreateThreadRequest) -> ClientResult<Thread> {
        let envelope: ThreadEnvelope = self
            .send(self.request(Method::POST, "/api/threads").json(req))
            .await?;
        Ok(envelope.thread)
    }

    pub async fn update_thread(&self, req: &UpdateThreadRequest) -> ClientResult<Thread> {
        let envelope: ThreadEnvelope = self
            .send(self.request(Method::PUT, "/api/threads").json(req))
            .await?;
        Ok(envelope.thread)
    }

    pub async fn delete_thread(&self, id: &str) -> ClientResult<()> {
        let _: SuccessResponse = self
            .send(self.request(Method::DELETE, "/api/threads").query(&[("id", id)]))
            .await?;
        Ok(())
    }

    pub async fn list_replies(&self, thread_id: &str) -> ClientResult<Vec<Reply>> {
        let path = format!("/api/threads/{}/replies", thread_id);
        let envelope: RepliesEnvelope = self.send(self.request(Method::GET, &path)).await?;
        Ok(envelope.replies)
    }

    pub async fn create_reply(&self, thread_id: &str, content: &str) -> ClientResult<Reply> {
        let path = format!("/api/threads/{}/replies", thread_id);
        let body = CreateReplyRequest {
            content: content.to_string(),
        };
        let envelope: ReplyEnvelope = self
            .send(self.request(Method::POST, &path).json(&body))
            .await?;
        Ok(envelope.reply)
    }

    pub async fn delete_reply(&self, thread_id: &str, reply_id: &str) -> ClientResult<()> {
        let path = format!("/api/threads/{}/replies", thread_id);
        let _: SuccessResponse = self
            .send(self.request(Method::DELETE, &path).query(&[("id", reply_id)]))
            .await?;
        Ok(())
    }

    // ===== Invitations =====

    pub async fn list_invitations(&self) -> ClientResult<Vec<Invitation>> {
        let envelope: InvitationsEnvelope = self
            .send(self.request(Method::GET, "/api/invitations"))
            .await?;
        Ok(envelope.invitations)
    }

    /// Public lookup used before registering with an invitation link
    pub async fn lookup_invitation(&self, token: &str) -> ClientResult<Invitation> {
        let envelope: InvitationEnvelope = self
            .send(self.request(Method::GET, "/api/invitations").query(&[("token", token)]))
            .await?;
        Ok(envelope.invitation)
    }

    pub async fn create_invitation(&self, req: &CreateInvitationRequest) -> ClientResult<Invitation> {
        let envelope: InvitationEnvelope = self
            .send(self.request(Method::POST, "/api/invitations").json(req))
            .await?;
        Ok(envelope.invitation)
    }

    pub async fn update_invitation(&self, req: &UpdateInvitationRequest) -> ClientResult<Invitation> {
        let envelope: InvitationEnvelope = self
            .send(self.request(Method::PUT, "/api/invitations").json(req))
            .await?;
        Ok(envelope.invitation)
    }

    // ===== Plumbing =====

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let request = self.http.request(method, url);

        match self.read_session(|s| s.token.clone()) {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let response = request.send().await?;
        Self::decode(response).await
    }

    /// Body of a 2xx response, or the server's `{"error"}` message
    async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = match response.json::<ErrorResponse>().await {
            Ok(body) => body.error,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string(),
        };

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn start_session(&self, response: AuthResponse) -> ClientResult<PublicUser> {
        let user = response.user.clone();
        self.set_session(Some(StoredSession {
            user: response.user,
            token: response.token,
        }));
        self.persist_session().await?;
        Ok(user)
    }

    async fn persist_session(&self) -> ClientResult<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        match self.read_session(Clone::clone) {
            Some(session) => store.save(&session).await,
            None => store.clear().await,
        }
    }

    fn require_session(&self) -> ClientResult<()> {
        if self.is_signed_in() {
            Ok(())
        } else {
            Err(ClientError::NotSignedIn)
        }
    }

    fn set_session(&self, session: Option<StoredSession>) {
        let mut guard = self.session.write().unwrap_or_else(|e| e.into_inner());
        *guard = session;
    }

    fn read_session<R>(&self, f: impl FnOnce(&StoredSession) -> R) -> Option<R> {
        let guard = self.session.read().unwrap_or_else(|e| e.into_inner());
        guard.as_ref().map(f)
    }
}
