/// Account manager backed by the `users` JSON document
use crate::{
    account::{
        normalize_email, password, RegisterRequest, Role, SessionClaims, UpdateUserRequest, User,
    },
    config::ServerConfig,
    error::{ApiError, ApiResult},
    metrics,
    store::{Collection, DocumentBackend},
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Account manager service
pub struct AccountManager {
    users: Collection<User>,
    config: Arc<ServerConfig>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(backend: Arc<dyn DocumentBackend>, config: Arc<ServerConfig>) -> Self {
        Self {
            users: Collection::new(backend),
            config,
        }
    }

    /// Create a new account.
    ///
    /// The first account ever created becomes an admin; every later one is a
    /// member. Invitation checks happen at the API layer.
    pub async fn create_account(&self, req: &RegisterRequest) -> ApiResult<User> {
        req.validate()?;

        let email = normalize_email(&req.email);
        let display_name = req.display_name.trim().to_string();
        if display_name.is_empty() {
            return Err(ApiError::Validation("Display name is required".to_string()));
        }

        let password_hash = password::hash_password(&req.password).await?;

        let user = self
            .users
            .update(|users| {
                if users.iter().any(|u| u.email == email) {
                    return Err(ApiError::Conflict("Email already registered".to_string()));
                }

                let role = if users.is_empty() {
                    Role::Admin
                } else {
                    Role::Member
                };

                let now = Utc::now();
                let user = User {
                    id: Uuid::new_v4().to_string(),
                    email: email.clone(),
                    password_hash,
                    display_name,
                    school: non_empty(req.school.clone()),
                    job_title: non_empty(req.job_title.clone()),
                    bio: None,
                    avatar_url: None,
                    role,
                    created_at: now,
                    updated_at: now,
                };
                users.push(user.clone());
                Ok(user)
            })
            .await?;

        metrics::record_account_creation(user.role.as_str());
        tracing::info!("Registered {} as {}", user.email, user.role.as_str());

        Ok(user)
    }

    /// Authenticate with email and password
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<(User, String)> {
        let email = normalize_email(email);
        let invalid = || ApiError::Authentication("Invalid email or password".to_string());

        let user = self
            .users
            .find(|u| u.email == email)
            .await?
            .ok_or_else(invalid)?;

        if !password::verify_password(password, &user.password_hash).await? {
            tracing::debug!("Rejected password for {}", email);
            return Err(invalid());
        }

        let token = self.issue_token(&user)?;
        Ok((user, token))
    }

    /// Generate a signed session token for a user
    pub fn issue_token(&self, user: &User) -> ApiResult<String> {
        use jsonwebtoken::{encode, EncodingKey, Header};

        let now = Utc::now();
        let claims = SessionClaims {
            sub: user.id.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.config.authentication.session_ttl_hours)).timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.authentication.jwt_secret.as_bytes()),
        )
        .map_err(|e| ApiError::Token(format!("Failed to generate token: {}", e)))
    }

    /// Get a user by id
    pub async fn get_user(&self, id: &str) -> ApiResult<User> {
        self.users.get(id).await
    }

    /// Find a user by email
    pub async fn find_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        let email = normalize_email(email);
        self.users.find(|u| u.email == email).await
    }

    /// Member directory, sorted by display name
    pub async fn list_users(&self) -> ApiResult<Vec<User>> {
        let mut users = self.users.all().await?;
        users.sort_by_key(|u| u.display_name.to_lowercase());
        Ok(users)
    }

    /// Number of registered accounts
    pub async fn user_count(&self) -> ApiResult<usize> {
        self.users.count().await
    }

    /// Update a profile and, for admins, a role
    pub async fn update_user(&self, actor: &User, req: UpdateUserRequest) -> ApiResult<User> {
        req.validate()?;

        if !actor.can_manage(&req.id) {
            return Err(ApiError::Authorization(
                "You can only edit your own profile".to_string(),
            ));
        }

        if req.role.is_some() && !actor.is_admin() {
            return Err(ApiError::Authorization(
                "Only admins can change roles".to_string(),
            ));
        }

        let updated = self
            .users
            .update(|users| {
                let admin_count = users.iter().filter(|u| u.is_admin()).count();

                let user = users
                    .iter_mut()
                    .find(|u| u.id == req.id)
                    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

                if let Some(role) = req.role {
                    if user.role == Role::Admin && role == Role::Member && admin_count <= 1 {
                        return Err(ApiError::Validation(
                            "Cannot demote the last admin".to_string(),
                        ));
                    }
                    user.role = role;
                }

                if let Some(display_name) = req.display_name {
                    let display_name = display_name.trim().to_string();
                    if display_name.is_empty() {
                        return Err(ApiError::Validation(
                            "Display name is required".to_string(),
                        ));
                    }
                    user.display_name = display_name;
                }
                if req.school.is_some() {
                    user.school = non_empty(req.school);
                }
                if req.job_title.is_some() {
                    user.job_title = non_empty(req.job_title);
                }
                if req.bio.is_some() {
                    user.bio = non_empty(req.bio);
                }
                if req.avatar_url.is_some() {
                    user.avatar_url = non_empty(req.avatar_url);
                }

                user.updated_at = Utc::now();
                Ok(user.clone())
            })
            .await?;

        tracing::info!("{} updated profile of {}", actor.id, updated.id);
        Ok(updated)
    }
}
