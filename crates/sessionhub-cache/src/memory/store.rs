//! In-memory cache store using moka for TTL'd records and dashmap for sets.

use std::collections::{BTreeMap, HashSet};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use moka::Expiry;
use moka::future::Cache;

use sessionhub_core::config::MemoryCacheConfig;
use sessionhub_core::result::AppResult;

use crate::store::{CacheStore, ScanPage};

/// A stored value with its own time-to-live.
#[derive(Debug, Clone)]
struct Record {
    value: Arc<str>,
    ttl: Duration,
}

/// Expires each record after the TTL it was written with.
struct RecordExpiry;

impl Expiry<String, Record> for RecordExpiry {
    fn expire_after_create(&self, _key: &String, value: &Record, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Record,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Single-process [`CacheStore`].
///
/// Records expire lazily through moka; sets never expire and disappear
/// once emptied, matching the Redis layout. Scans cover set keys only.
/// The cursor is a position in key-hash order, so sets removed mid-scan
/// never cause a surviving set to be skipped.
#[derive(Debug, Clone)]
pub struct MemoryCacheStore {
    records: Cache<String, Record>,
    sets: Arc<DashMap<String, HashSet<String>>>,
}

impl MemoryCacheStore {
    /// Create a store from configuration.
    pub fn new(config: &MemoryCacheConfig) -> Self {
        let records = Cache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(RecordExpiry)
            .build();

        Self {
            records,
            sets: Arc::new(DashMap::new()),
        }
    }

    fn remove_from_set(&self, set_key: &str, members: &[String]) -> u64 {
        let mut removed = 0;
        let now_empty = match self.sets.get_mut(set_key) {
            Some(mut set) => {
                for member in members {
                    if set.remove(member) {
                        removed += 1;
                    }
                }
                set.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.sets.remove_if(set_key, |_, set| set.is_empty());
        }
        removed
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new(&MemoryCacheConfig::default())
    }
}

fn key_hash(key: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

/// Glob subset used by the session layout: exact keys or a trailing `*`.
fn matches(pattern: &str, key: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => key == pattern,
    }
}

/// Pick the keys of one scan page from `(hash, key)` pairs.
///
/// Holds at most `count` distinct hashes at a time, so memory stays bounded
/// by the page size rather than the number of sets. Keys sharing a hash
/// always land on the same page. Returns the keys and the next cursor,
/// `0` once nothing is left past the page.
fn select_page(
    entries: impl Iterator<Item = (u64, String)>,
    cursor: u64,
    count: usize,
) -> (Vec<String>, u64) {
    let count = count.max(1);
    let mut buckets: BTreeMap<u64, Vec<String>> = BTreeMap::new();
    let mut more = false;

    for (hash, key) in entries.filter(|(hash, _)| *hash >= cursor) {
        if buckets.len() == count && !buckets.contains_key(&hash) {
            let Some((&last, _)) = buckets.last_key_value() else {
                continue;
            };
            more = true;
            if hash > last {
                continue;
            }
            buckets.pop_last();
        }
        buckets.entry(hash).or_default().push(key);
    }

    let next = match buckets.last_key_value() {
        Some((&last, _)) if more => last.checked_add(1).unwrap_or(0),
        _ => 0,
    };
    (buckets.into_values().flatten().collect(), next)
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.records.get(key).await.map(|r| r.value.to_string()))
    }

    async fn get_many(&self, keys: &[String]) -> AppResult<Vec<Option<String>>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.records.get(key).await.map(|r| r.value.to_string()));
        }
        Ok(values)
    }

    async fn set_indexed(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        set_key: &str,
        member: &str,
    ) -> AppResult<()> {
        self.records
            .insert(
                key.to_string(),
                Record {
                    value: Arc::from(value),
                    ttl,
                },
            )
            .await;
        self.sets
            .entry(set_key.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn delete_indexed(
        &self,
        keys: &[String],
        set_key: &str,
        members: &[String],
    ) -> AppResult<()> {
        for key in keys {
            self.records.invalidate(key).await;
        }
        self.remove_from_set(set_key, members);
        Ok(())
    }

    async fn members(&self, set_key: &str) -> AppResult<Vec<String>> {
        Ok(self
            .sets
            .get(set_key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn remove_members(&self, set_key: &str, members: &[String]) -> AppResult<u64> {
        Ok(self.remove_from_set(set_key, members))
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> AppResult<ScanPage> {
        let entries = self
            .sets
            .iter()
            .filter(|entry| matches(pattern, entry.key()))
            .map(|entry| (key_hash(entry.key()), entry.key().clone()));
        let (keys, cursor) = select_page(entries, cursor, count);
        Ok(ScanPage { cursor, keys })
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
