//! Refresh-session management configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Refresh-session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Which store holds refresh sessions. Chosen once at startup.
    #[serde(default)]
    pub backend: SessionBackend,
    /// Lifetime of a refresh session in hours.
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_hours: u64,
    /// Soft cap on concurrent sessions per user.
    #[serde(default = "default_max_sessions")]
    pub max_sessions_per_user: usize,
    /// Deadline applied to every store call made by the token service.
    #[serde(default = "default_store_timeout")]
    pub store_timeout_ms: u64,
    /// `COUNT` hint passed to each scan page during reclamation.
    #[serde(default = "default_reclaim_batch")]
    pub reclaim_batch_size: usize,
}

impl SessionConfig {
    /// Refresh-session lifetime as a chrono duration.
    pub fn refresh_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.refresh_ttl_hours as i64)
    }

    /// Store deadline as a std duration.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackend::default(),
            refresh_ttl_hours: default_refresh_ttl(),
            max_sessions_per_user: default_max_sessions(),
            store_timeout_ms: default_store_timeout(),
            reclaim_batch_size: default_reclaim_batch(),
        }
    }
}

/// Store that backs the session repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionBackend {
    /// PostgreSQL `refresh_sessions` table.
    Database,
    /// Key-value cache store (Redis or in-memory).
    Cache,
}

impl Default for SessionBackend {
    fn default() -> Self {
        Self::Cache
    }
}

impl std::fmt::Display for SessionBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionBackend::Database => write!(f, "database"),
            SessionBackend::Cache => write!(f, "cache"),
        }
    }
}

fn default_refresh_ttl() -> u64 {
    24 * 30
}

fn default_max_sessions() -> usize {
    5
}

fn default_store_timeout() -> u64 {
    5_000
}

fn default_reclaim_batch() -> usize {
    100
}
