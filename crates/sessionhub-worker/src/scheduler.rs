//! Cron scheduler for periodic jobs.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

use sessionhub_core::config::WorkerConfig;
use sessionhub_core::error::AppError;

use crate::jobs::ReclaimJob;

/// Cron-based scheduler for periodic background tasks.
pub struct CronScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Cron expression for reclamation (seconds field first)
    reclaim_cron: String,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler")
            .field("reclaim_cron", &self.reclaim_cron)
            .finish_non_exhaustive()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler.
    pub async fn new(config: &WorkerConfig) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self {
            scheduler,
            reclaim_cron: config.reclaim_cron.clone(),
        })
    }

    /// Register the expired-session reclamation job.
    pub async fn register_reclaim(&self, job: Arc<ReclaimJob>) -> Result<(), AppError> {
        let cron = CronJob::new_async(self.reclaim_cron.as_str(), move |_uuid, _lock| {
            let job = Arc::clone(&job);
            Box::pin(async move {
                // Errors are already logged by the job; the next tick retries.
                let _ = job.run_once().await;
            })
        })
        .map_err(|e| {
            AppError::configuration(format!(
                "Invalid reclaim schedule '{}': {e}",
                self.reclaim_cron
            ))
        })?;

        self.scheduler
            .add(cron)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add reclaim schedule: {e}")))?;

        tracing::info!(cron = %self.reclaim_cron, "Registered: session reclamation");
        Ok(())
    }

    /// Start the scheduler.
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Shut the scheduler down.
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }
}
