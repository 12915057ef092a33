/// Disk-based document storage backend
use crate::{
    error::{ApiError, ApiResult},
    store::DocumentBackend,
};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

/// Disk storage backend
///
/// Stores each document as `{base}/{name}.json`. Writes go to a temporary
/// sibling file first and are renamed into place.
#[derive(Clone)]
pub struct DiskDocumentBackend {
    base_path: PathBuf,
}

impl DiskDocumentBackend {
    /// Create a new disk storage backend
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Get the file path for a document
    fn document_path(&self, name: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", name))
    }

    fn temp_path(&self, name: &str) -> PathBuf {
        self.base_path.join(format!(".{}.json.tmp", name))
    }
}

#[async_trait]
impl DocumentBackend for DiskDocumentBackend {
    async fn read(&self, name: &str) -> ApiResult<Option<Vec<u8>>> {
        let path = self.document_path(name);

        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ApiError::Internal(format!(
                "Failed to read document {:?}: {}",
                path, e
            ))),
        }
    }

    async fn write(&self, name: &str, data: Vec<u8>) -> ApiResult<()> {
        fs::create_dir_all(&self.base_path).await.map_err(|e| {
            ApiError::Internal(format!("Failed to create data directory: {}", e))
        })?;

        let temp = self.temp_path(name);
        let path = self.document_path(name);

        fs::write(&temp, data).await.map_err(|e| {
            ApiError::Internal(format!("Failed to write document {:?}: {}", temp, e))
        })?;
        fs::rename(&temp, &path).await.map_err(|e| {
            ApiError::Internal(format!("Failed to replace document {:?}: {}", path, e))
        })?;

        Ok(())
    }

    async fn health_check(&self) -> ApiResult<()> {
        let probe = self.base_path.join(".health");
        fs::write(&probe, b"ok").await?;
        fs::remove_file(&probe).await?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("disk:{}", self.base_path.display())
    }
}
