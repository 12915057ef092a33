/// Background task implementations
use crate::{backup::BackupManager, context::AppContext, error::ApiResult};

/// Take a snapshot, then prune expired ones. Returns how many were pruned.
pub async fn backup_documents(ctx: &AppContext) -> ApiResult<usize> {
    let manager = BackupManager::new(ctx.config.backup.clone(), ctx.documents.clone());
    manager.run_backup().await?;
    manager.prune().await
}

/// Health check - verify the document store still accepts writes
pub async fn health_check(ctx: &AppContext) -> ApiResult<()> {
    ctx.documents.health_check().await
}
