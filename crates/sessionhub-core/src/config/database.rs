//! PostgreSQL settings for the `users` and `refresh_sessions` tables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Pool settings for the relational store.
///
/// The pool serves the user store in every deployment and the session
/// repository when `session.backend = "database"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `postgres://` URL. Its password is masked whenever it is logged.
    pub url: String,
    /// Upper bound on open connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connections kept open while idle; clamped to `max_connections`.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// How long a caller waits to acquire a connection.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    /// Idle connections above the minimum close after this long.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
}

impl DatabaseConfig {
    /// `(min, max)` connection counts with `1 <= max` and `min <= max`.
    pub fn pool_bounds(&self) -> (u32, u32) {
        let max = self.max_connections.max(1);
        (self.min_connections.min(max), max)
    }

    /// Acquire timeout as a std duration.
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Idle timeout as a std duration.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_idle_timeout() -> u64 {
    300
}
