//! Expired-session reclamation.

use std::sync::Arc;
use std::time::Instant;

use sessionhub_core::result::AppResult;
use sessionhub_entity::session::SessionRepository;

/// Asks the active session repository to drop expired bookkeeping.
#[derive(Debug, Clone)]
pub struct ReclaimJob {
    sessions: Arc<dyn SessionRepository>,
}

impl ReclaimJob {
    /// Create a job over the active repository.
    pub fn new(sessions: Arc<dyn SessionRepository>) -> Self {
        Self { sessions }
    }

    /// Run one reclamation pass. Failures are logged and returned; the
    /// pass is not retried.
    pub async fn run_once(&self) -> AppResult<u64> {
        tracing::info!("Running expired session reclamation");
        let started = Instant::now();

        match self.sessions.reclaim_expired().await {
            Ok(removed) => {
                tracing::info!(
                    removed,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Session reclamation finished"
                );
                Ok(removed)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Session reclamation failed"
                );
                Err(e)
            }
        }
    }
}
