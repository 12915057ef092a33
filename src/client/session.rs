/// Signed-in session kept on local disk between runs
use crate::{account::PublicUser, client::ClientResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// The signed-in user and their session token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub user: PublicUser,
    pub token: String,
}

/// JSON file holding at most one session
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved session, if any. An unreadable file counts as signed out.
    pub async fn load(&self) -> ClientResult<Option<StoredSession>> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&data) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::warn!("Ignoring unreadable session file {:?}: {}", self.path, e);
                Ok(None)
            }
        }
    }

    pub async fn save(&self, session: &StoredSession) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp = self.path.with_extension("tmp");
        fs::write(&temp, serde_json::to_vec_pretty(session)?).await?;
        fs::rename(&temp, &self.path).await?;
        Ok(())
    }

    pub async fn clear(&self) -> ClientResult<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Role;
    use chrono::Utc;
    use tempfile::TempDir;

    fn session() -> StoredSession {
        let now = Utc::now();
        StoredSession {
            user: PublicUser {
                id: "u1".to_string(),
                email: "a@school.edu".to_string(),
                display_name: "Ada".to_string(),
                school: None,
                job_title: None,
                bio: None,
                avatar_url: None,
                role: Role::Member,
                created_at: now,
                updated_at: now,
            },
            token: "token".to_string(),
        }
    }

    #[tokio::test]
    async fn test_save_load_clear() {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::new(temp_dir.path().join("profile").join("session.json"));

        assert_eq!(store.load().await.unwrap(), None);

        store.save(&session()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(session()));

        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_file_is_signed_out() {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::new(temp_dir.path().join("session.json"));
        fs::write(store.path(), b"{not json").await.unwrap();

        assert_eq!(store.load().await.unwrap(), None);
    }
}
