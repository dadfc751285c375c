//! Key-value store contract used by the cache session repository.

use std::time::Duration;

use async_trait::async_trait;

use sessionhub_core::result::AppResult;

/// One page of a cursor scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Cursor for the next call; `0` once the scan is complete.
    pub cursor: u64,
    /// Keys matched on this page. May be empty even when more pages follow.
    pub keys: Vec<String>,
}

/// Minimal key-value surface: string records with TTL plus string sets.
///
/// Writes that touch a record and its index set go through a single call
/// so implementations can apply them atomically. Every backend failure is
/// `StoreUnavailable`.
#[async_trait]
pub trait CacheStore: Send + Sync + std::fmt::Debug + 'static {
    /// Read a record.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Read several records in one round trip, in key order.
    async fn get_many(&self, keys: &[String]) -> AppResult<Vec<Option<String>>>;

    /// Write a record with a TTL and add `member` to `set_key`, atomically.
    async fn set_indexed(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        set_key: &str,
        member: &str,
    ) -> AppResult<()>;

    /// Delete records and remove members from `set_key`, atomically.
    async fn delete_indexed(&self, keys: &[String], set_key: &str, members: &[String])
    -> AppResult<()>;

    /// All members of a set; empty when the set does not exist.
    async fn members(&self, set_key: &str) -> AppResult<Vec<String>>;

    /// Remove members from a set. Returns how many were present.
    async fn remove_members(&self, set_key: &str, members: &[String]) -> AppResult<u64>;

    /// One step of a cursor scan over set keys matching `pattern`.
    ///
    /// Start with cursor `0`; `count` is a hint for the page size.
    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> AppResult<ScanPage>;

    /// Check store connectivity.
    async fn health_check(&self) -> AppResult<bool>;
}
