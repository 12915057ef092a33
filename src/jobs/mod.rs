use std::sync::Arc;
use std::time::Instant;
use tokio::{
    task::JoinHandle,
    time::{interval, Duration},
};
use tracing::{error, info};

use crate::metrics;

pub mod tasks;

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<crate::context::AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<crate::context::AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) -> Vec<JoinHandle<()>> {
        info!("Starting background job scheduler");

        let mut handles = vec![tokio::spawn(Self::health_check_job(Arc::clone(&self)))];

        if self.context.config.backup.enabled {
            handles.push(tokio::spawn(Self::backup_job(Arc::clone(&self))));
        } else {
            info!("Automated backups are disabled");
        }

        info!("Background jobs started");
        handles
    }

    /// Snapshot the documents and prune old snapshots
    async fn backup_job(scheduler: Arc<Self>) {
        let hours = scheduler.context.config.backup.interval_hours.max(1);
        let mut interval = interval(Duration::from_secs(hours * 3600));

        info!(
            "Backups every {} hours, kept for {} days",
            hours, scheduler.context.config.backup.retain_days
        );

        loop {
            interval.tick().await;
            let start = Instant::now();

            match tasks::backup_documents(&scheduler.context).await {
                Ok(pruned) => {
                    metrics::record_background_job("backup", "success", start.elapsed().as_secs_f64());
                    if pruned > 0 {
                        info!("Pruned {} old backups", pruned);
                    }
                }
                Err(e) => {
                    metrics::record_background_job("backup", "failure", start.elapsed().as_secs_f64());
                    error!("Scheduled backup failed: {}", e);
                }
            }
        }
    }

    /// Health check job (runs every 5 minutes)
    async fn health_check_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(300));

        loop {
            interval.tick().await;
            let start = Instant::now();

            match tasks::health_check(&scheduler.context).await {
                Ok(()) => {
                    metrics::record_background_job("health_check", "success", start.elapsed().as_secs_f64());
                }
                Err(e) => {
                    metrics::record_background_job("health_check", "failure", start.elapsed().as_secs_f64());
                    error!("Health check failed: {}", e);
                }
            }
        }
    }
}
