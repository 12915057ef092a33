/// Scheduled snapshots of the JSON documents
use crate::{
    error::{ApiError, ApiResult},
    store::DocumentBackend,
};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{info, warn};

/// Every document a snapshot contains
pub const DOCUMENTS: [&str; 6] = ["users", "pins", "projects", "threads", "replies", "invitations"];

const SNAPSHOT_PREFIX: &str = "backup_";
const SNAPSHOT_FORMAT: &str = "%Y%m%dT%H%M%S%.3fZ";

/// Backup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Enable automated backups
    pub enabled: bool,

    /// Backup interval in hours (default: 24 hours = daily)
    pub interval_hours: u64,

    /// Directory receiving one sub-directory per snapshot
    pub backup_dir: PathBuf,

    /// Number of days to retain backups (default: 30)
    pub retain_days: u32,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_hours: 24,
            backup_dir: PathBuf::from("./backups"),
            retain_days: 30,
        }
    }
}

impl BackupConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let var = |key: &str| std::env::var(key).ok();

        Self {
            enabled: var("COMMONS_BACKUP_ENABLED")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.enabled),
            interval_hours: var("COMMONS_BACKUP_INTERVAL_HOURS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.interval_hours),
            backup_dir: var("COMMONS_BACKUP_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.backup_dir),
            retain_days: var("COMMONS_BACKUP_RETAIN_DAYS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.retain_days),
        }
    }
}

/// Written next to the documents of every snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupManifest {
    pub backup_timestamp: DateTime<Utc>,
    pub documents: Vec<String>,
    pub size_bytes: u64,
}

/// A snapshot found on disk
#[derive(Debug, Clone)]
pub struct BackupMetadata {
    pub timestamp: DateTime<Utc>,
    pub path: PathBuf,
}

/// Takes and prunes snapshots
pub struct BackupManager {
    config: BackupConfig,
    backend: Arc<dyn DocumentBackend>,
}

impl BackupManager {
    pub fn new(config: BackupConfig, backend: Arc<dyn DocumentBackend>) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// Copy every existing document into a new snapshot directory
    pub async fn run_backup(&self) -> ApiResult<PathBuf> {
        let now = Utc::now();
        let dir = self
            .config
            .backup_dir
            .join(format!("{}{}", SNAPSHOT_PREFIX, now.format(SNAPSHOT_FORMAT)));
        tokio::fs::create_dir_all(&dir).await?;

        let mut documents = Vec::new();
        let mut size_bytes = 0u64;

        for name in DOCUMENTS {
            if let Some(data) = self.backend.read(name).await? {
                size_bytes += data.len() as u64;
                tokio::fs::write(dir.join(format!("{}.json", name)), data).await?;
                documents.push(name.to_string());
            }
        }

        let manifest = BackupManifest {
            backup_timestamp: now,
            documents,
            size_bytes,
        };
        tokio::fs::write(dir.join("manifest.json"), serde_json::to_vec_pretty(&manifest)?).await?;

        info!(
            "Backed up {} documents ({} bytes) to {:?}",
            manifest.documents.len(),
            size_bytes,
            dir
        );
        Ok(dir)
    }

    /// Delete snapshots older than the retention window
    pub async fn prune(&self) -> ApiResult<usize> {
        let cutoff = Utc::now() - Duration::days(self.config.retain_days as i64);
        let mut deleted = 0;

        for backup in list_backups(&self.config.backup_dir).await? {
            if backup.timestamp >= cutoff {
                continue;
            }
            match tokio::fs::remove_dir_all(&backup.path).await {
                Ok(()) => {
                    info!("Deleted old backup {:?}", backup.path);
                    deleted += 1;
                }
                Err(e) => warn!("Failed to delete backup {:?}: {}", backup.path, e),
            }
        }

        Ok(deleted)
    }
}

fn parse_snapshot_name(name: &str) -> Option<DateTime<Utc>> {
    let stamp = name.strip_prefix(SNAPSHOT_PREFIX)?;
    NaiveDateTime::parse_from_str(stamp, SNAPSHOT_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Snapshots in `backup_dir`, newest first
pub async fn list_backups(backup_dir: &Path) -> ApiResult<Vec<BackupMetadata>> {
    let mut entries = match tokio::fs::read_dir(backup_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(ApiError::Internal(format!(
                "Failed to read backup dir: {}",
                e
            )))
        }
    };

    let mut backups = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let timestamp = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(parse_snapshot_name);
        if let Some(timestamp) = timestamp {
            backups.push(BackupMetadata { timestamp, path });
        }
    }

    backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(backups)
}
