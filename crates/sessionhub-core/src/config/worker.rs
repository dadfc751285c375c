//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Background job worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether scheduled jobs run in this process.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Six-field cron expression (with seconds) for expiry reclamation.
    #[serde(default = "default_reclaim_cron")]
    pub reclaim_cron: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reclaim_cron: default_reclaim_cron(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_reclaim_cron() -> String {
    "0 0 3 * * *".to_string()
}
