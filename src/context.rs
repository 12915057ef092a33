/// Application context and dependency injection
use crate::{
    account::AccountManager,
    board::PinManager,
    config::ServerConfig,
    error::{ApiError, ApiResult},
    forum::ForumManager,
    invites::InvitationManager,
    mailer::Mailer,
    rate_limit::RateLimiter,
    showcase::ProjectManager,
    store::{DiskDocumentBackend, DocumentBackend},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub documents: Arc<dyn DocumentBackend>,
    pub account_manager: Arc<AccountManager>,
    pub pin_manager: Arc<PinManager>,
    pub project_manager: Arc<ProjectManager>,
    pub forum_manager: Arc<ForumManager>,
    pub invite_manager: Arc<InvitationManager>,
    // Rate limiter
    pub rate_limiter: Arc<RateLimiter>,
    // Email mailer
    pub mailer: Arc<Mailer>,
    pub started_at: DateTime<Utc>,
}

impl AppContext {
    /// Create a new application context storing documents on disk
    pub async fn new(config: ServerConfig) -> ApiResult<Self> {
        config.validate()?;
        Self::ensure_directories(&config).await?;

        let backend = Arc::new(DiskDocumentBackend::new(
            config.storage.data_directory.clone(),
        ));
        Self::with_backend(config, backend)
    }

    /// Create a context over an existing document backend
    pub fn with_backend(config: ServerConfig, documents: Arc<dyn DocumentBackend>) -> ApiResult<Self> {
        let config = Arc::new(config);

        let account_manager = Arc::new(AccountManager::new(
            Arc::clone(&documents),
            Arc::clone(&config),
        ));
        let pin_manager = Arc::new(PinManager::new(Arc::clone(&documents)));
        let project_manager = Arc::new(ProjectManager::new(Arc::clone(&documents)));
        let forum_manager = Arc::new(ForumManager::new(Arc::clone(&documents)));
        let invite_manager = Arc::new(InvitationManager::new(
            Arc::clone(&documents),
            config.invites.expiry_days,
        ));

        let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));
        let mailer = Arc::new(Mailer::new(config.email.clone())?);

        tracing::debug!("Document store: {}", documents.describe());

        Ok(Self {
            config,
            documents,
            account_manager,
            pin_manager,
            project_manager,
            forum_manager,
            invite_manager,
            rate_limiter,
            mailer,
            started_at: Utc::now(),
        })
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> ApiResult<()> {
        let mut dirs = vec![&config.storage.data_directory];
        if config.backup.enabled {
            dirs.push(&config.backup.backup_dir);
        }

        for dir in dirs {
            if !dir.exists() {
                tokio::fs::create_dir_all(dir).await.map_err(|e| {
                    ApiError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
                })?;
            }
        }

        Ok(())
    }

    /// Base URL used in links sent to users
    pub fn service_url(&self) -> String {
        match &self.config.service.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!(
                "http://{}:{}",
                self.config.service.hostname, self.config.service.port
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_new_creates_data_directory() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().join("nested").join("data");

        let ctx = AppContext::new(ServerConfig::ephemeral(&data_dir)).await.unwrap();
        assert!(data_dir.exists());
        assert!(ctx.documents.describe().contains("data"));
    }

    #[tokio::test]
    async fn test_service_url() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = ServerConfig::ephemeral(temp_dir.path());
        config.service.port = 3000;

        let ctx = AppContext::new(config.clone()).await.unwrap();
        assert_eq!(ctx.service_url(), "http://127.0.0.1:3000");

        config.service.public_url = Some("https://commons.school.edu/".to_string());
        let ctx = AppContext::new(config).await.unwrap();
        assert_eq!(ctx.service_url(), "https://commons.school.edu");
    }
}
