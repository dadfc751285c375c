//! Redis cache store implementation.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

use sessionhub_core::error::{AppError, ErrorKind};
use sessionhub_core::result::AppResult;

use super::client::RedisClient;
use crate::store::{CacheStore, ScanPage};

/// Redis-backed [`CacheStore`].
///
/// Record-plus-index writes are sent as `MULTI`/`EXEC` pipelines so the
/// record and its marker are never observed apart.
#[derive(Debug, Clone)]
pub struct RedisCacheStore {
    client: RedisClient,
}

impl RedisCacheStore {
    /// Create a new Redis cache store.
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    /// Map a Redis error to an AppError.
    fn map_err(e: redis::RedisError) -> AppError {
        AppError::with_source(ErrorKind::StoreUnavailable, format!("Redis error: {e}"), e)
    }

    fn prefixed(&self, keys: &[String]) -> Vec<String> {
        keys.iter().map(|k| self.client.prefixed_key(k)).collect()
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.client.conn();
        conn.get(self.client.prefixed_key(key))
            .await
            .map_err(Self::map_err)
    }

    async fn get_many(&self, keys: &[String]) -> AppResult<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for key in self.prefixed(keys) {
            pipe.get(key);
        }

        let mut conn = self.client.conn();
        pipe.query_async(&mut conn).await.map_err(Self::map_err)
    }

    async fn set_indexed(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        set_key: &str,
        member: &str,
    ) -> AppResult<()> {
        let ttl_ms = ttl.as_millis().max(1) as u64;
        let mut conn = self.client.conn();
        let _: () = redis::pipe()
            .atomic()
            .cmd("SET")
            .arg(self.client.prefixed_key(key))
            .arg(value)
            .arg("PX")
            .arg(ttl_ms)
            .ignore()
            .sadd(self.client.prefixed_key(set_key), member)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;

        debug!(ttl_ms, "Indexed record written");
        Ok(())
    }

    async fn delete_indexed(
        &self,
        keys: &[String],
        set_key: &str,
        members: &[String],
    ) -> AppResult<()> {
        if keys.is_empty() && members.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        if !keys.is_empty() {
            pipe.del(self.prefixed(keys)).ignore();
        }
        if !members.is_empty() {
            pipe.srem(self.client.prefixed_key(set_key), members).ignore();
        }

        let mut conn = self.client.conn();
        let _: () = pipe.query_async(&mut conn).await.map_err(Self::map_err)?;
        Ok(())
    }

    async fn members(&self, set_key: &str) -> AppResult<Vec<String>> {
        let mut conn = self.client.conn();
        conn.smembers(self.client.prefixed_key(set_key))
            .await
            .map_err(Self::map_err)
    }

    async fn remove_members(&self, set_key: &str, members: &[String]) -> AppResult<u64> {
        if members.is_empty() {
            return Ok(0);
        }
        let mut conn = self.client.conn();
        conn.srem(self.client.prefixed_key(set_key), members)
            .await
            .map_err(Self::map_err)
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> AppResult<ScanPage> {
        let mut conn = self.client.conn();
        let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(self.client.prefixed_key(pattern))
            .arg("COUNT")
            .arg(count.max(1))
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;

        Ok(ScanPage {
            cursor: next,
            keys: keys
                .into_iter()
                .map(|k| self.client.unprefixed_key(k))
                .collect(),
        })
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.conn();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(pong == "PONG")
    }
}
