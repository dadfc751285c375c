//! Cache manager that selects the configured store.

use std::sync::Arc;

use tracing::info;

use sessionhub_core::config::CacheConfig;
use sessionhub_core::error::AppError;
use sessionhub_core::result::AppResult;

use crate::store::CacheStore;

/// Holds the cache store chosen from configuration.
#[derive(Debug, Clone)]
pub struct CacheManager {
    inner: Arc<dyn CacheStore>,
}

impl CacheManager {
    /// Build the store named by `cache.provider`.
    pub async fn new(config: &CacheConfig) -> AppResult<Self> {
        let inner: Arc<dyn CacheStore> = match config.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!("Initializing Redis cache store");
                let client = crate::redis::RedisClient::connect(&config.redis).await?;
                Arc::new(crate::redis::RedisCacheStore::new(client))
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!(
                    max_capacity = config.memory.max_capacity,
                    "Initializing in-memory cache store"
                );
                Arc::new(crate::memory::MemoryCacheStore::new(&config.memory))
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown cache provider: '{other}'. Supported: memory, redis"
                )));
            }
        };

        Ok(Self { inner })
    }

    /// Wrap an existing store (for testing).
    pub fn from_store(store: Arc<dyn CacheStore>) -> Self {
        Self { inner: store }
    }

    /// Shared handle to the store.
    pub fn store(&self) -> Arc<dyn CacheStore> {
        Arc::clone(&self.inner)
    }

    /// Check store connectivity.
    pub async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
}
