//! SessionHub Server: refresh-session lifecycle manager.
//!
//! Migrates the database, binds the configured session backend, and runs
//! the reclamation schedule until Ctrl+C or SIGTERM. Login and rotation
//! flows live in `sessionhub_auth::TokenService`, which the embedding
//! auth layer builds over the same stores.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use sessionhub_cache::{CacheManager, CacheSessionRepository};
use sessionhub_core::config::{AppConfig, SessionBackend};
use sessionhub_core::error::AppError;
use sessionhub_database::repositories::PgSessionRepository;
use sessionhub_database::{DatabasePool, migration};
use sessionhub_entity::session::SessionRepository;
use sessionhub_worker::{CronScheduler, ReclaimJob};

#[tokio::main]
async fn main() {
    let env = std::env::var("SESSIONHUB_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Build every component, run until a shutdown signal, then stop the
/// scheduler.
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting SessionHub v{}", env!("CARGO_PKG_VERSION"));

    let db = DatabasePool::connect(&config.database).await?;
    if !db.health_check().await? {
        return Err(AppError::store_unavailable("Database failed its health check"));
    }
    migration::run_migrations(db.pool()).await?;

    let sessions: Arc<dyn SessionRepository> = match config.session.backend {
        SessionBackend::Database => Arc::new(PgSessionRepository::new(db.pool().clone())),
        SessionBackend::Cache => {
            let cache = CacheManager::new(&config.cache).await?;
            if !cache.health_check().await? {
                return Err(AppError::store_unavailable("Cache store failed its health check"));
            }
            Arc::new(CacheSessionRepository::new(
                cache.store(),
                config.session.reclaim_batch_size,
            ))
        }
    };
    tracing::info!(
        backend = %config.session.backend,
        max_sessions = config.session.max_sessions_per_user,
        refresh_ttl_hours = config.session.refresh_ttl_hours,
        "Session repository ready"
    );

    let mut scheduler = if config.worker.enabled {
        let scheduler = CronScheduler::new(&config.worker).await?;
        scheduler
            .register_reclaim(Arc::new(ReclaimJob::new(Arc::clone(&sessions))))
            .await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        tracing::info!("Background worker disabled");
        None
    };

    shutdown_signal().await;
    tracing::info!("Shutdown signal received");

    if let Some(scheduler) = scheduler.as_mut() {
        scheduler.shutdown().await?;
    }
    db.close().await;

    tracing::info!("SessionHub stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
