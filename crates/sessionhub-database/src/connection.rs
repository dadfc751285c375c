//! Pool shared by the user store and the relational session repository.

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use sessionhub_core::config::DatabaseConfig;
use sessionhub_core::error::{AppError, ErrorKind};
use sessionhub_core::redact::mask_url_password;

/// Handle to the SessionHub PostgreSQL pool.
///
/// Cloning is cheap; every clone shares the same connections.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Connect with the bounds and timeouts from `config`.
    ///
    /// A failure here is `StoreUnavailable`, the same kind a repository
    /// reports when the database drops mid-request.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let (min_connections, max_connections) = config.pool_bounds();
        info!(
            url = %mask_url_password(&config.url),
            max_connections,
            min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(config.acquire_timeout())
            .idle_timeout(config.idle_timeout())
            .connect(&config.url)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::StoreUnavailable,
                    format!("Failed to connect to database: {e}"),
                    e,
                )
            })?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// The sqlx pool, for repositories and migrations.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Round-trip `SELECT 1`.
    pub async fn health_check(&self) -> Result<bool, AppError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(|e| {
                AppError::with_source(ErrorKind::StoreUnavailable, "Database health check failed", e)
            })
    }

    /// Wait for in-flight queries, then close every connection.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database pool closed");
    }
}
