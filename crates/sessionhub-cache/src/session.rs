//! Cache-backed refresh-session repository.
//!
//! Layout:
//!
//! - `session:{token}`: JSON record, TTL = time left until `expiresAt`
//! - `user_sessions:{userId}`: set of `{token}:{expiresAtEpochMs}` markers, no TTL
//!
//! Records vanish on their own; markers outlive them and are dropped by
//! readers (filtered) and by [`SessionRepository::reclaim_expired`] (removed).

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use sessionhub_core::redact::token_hint;
use sessionhub_core::result::AppResult;
use sessionhub_entity::session::{
    AutoCommit, RefreshSession, SessionDraft, SessionRepository, SessionTransaction,
};

use crate::keys::{session_key, user_sessions_key, user_sessions_pattern};
use crate::marker::SessionMarker;
use crate::store::CacheStore;

/// JSON shape of a primary session record.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedSession {
    refresh_token: String,
    user_id: Uuid,
    fingerprint: String,
    ip_address: String,
    user_agent: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    expires_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    created_at: DateTime<Utc>,
}

impl From<&RefreshSession> for CachedSession {
    fn from(session: &RefreshSession) -> Self {
        let draft = session.to_draft();
        Self {
            refresh_token: draft.refresh_token,
            user_id: draft.user_id,
            fingerprint: draft.fingerprint,
            ip_address: draft.ip_address,
            user_agent: draft.user_agent,
            expires_at: session.expires_at(),
            created_at: session.created_at(),
        }
    }
}

impl CachedSession {
    fn into_session(self) -> AppResult<RefreshSession> {
        RefreshSession::restore(
            SessionDraft {
                user_id: self.user_id,
                refresh_token: self.refresh_token,
                fingerprint: self.fingerprint,
                ip_address: self.ip_address,
                user_agent: self.user_agent,
            },
            None,
            self.expires_at,
            self.created_at,
        )
    }
}

fn encode(session: &RefreshSession) -> AppResult<String> {
    Ok(serde_json::to_string(&CachedSession::from(session))?)
}

fn decode(raw: &str) -> AppResult<RefreshSession> {
    serde_json::from_str::<CachedSession>(raw)?.into_session()
}

/// Pull-based iterator over the pages of a key scan.
///
/// The next page is requested only when the caller asks for it, so a slow
/// consumer never has more than one page in hand.
struct KeyPages<'a> {
    store: &'a dyn CacheStore,
    pattern: String,
    count: usize,
    cursor: u64,
    done: bool,
}

impl<'a> KeyPages<'a> {
    fn new(store: &'a dyn CacheStore, pattern: String, count: usize) -> Self {
        Self {
            store,
            pattern,
            count,
            cursor: 0,
            done: false,
        }
    }

    /// Fetch the next page; `None` once the scan has completed.
    async fn next_page(&mut self) -> Option<AppResult<Vec<String>>> {
        if self.done {
            return None;
        }
        match self.store.scan(self.cursor, &self.pattern, self.count).await {
            Ok(page) => {
                self.cursor = page.cursor;
                self.done = page.cursor == 0;
                Some(Ok(page.keys))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Refresh sessions held in a [`CacheStore`].
#[derive(Debug, Clone)]
pub struct CacheSessionRepository {
    store: Arc<dyn CacheStore>,
    scan_count: usize,
}

impl CacheSessionRepository {
    /// Create a repository over `store`, scanning `scan_count` keys per page
    /// during reclamation.
    pub fn new(store: Arc<dyn CacheStore>, scan_count: usize) -> Self {
        Self {
            store,
            scan_count: scan_count.max(1),
        }
    }

    /// Remove expired and malformed markers from one set.
    async fn reclaim_set(&self, set_key: &str, now_ms: i64) -> AppResult<u64> {
        let stale: Vec<String> = self
            .store
            .members(set_key)
            .await?
            .into_iter()
            .filter(|raw| {
                SessionMarker::parse(raw).is_none_or(|marker| marker.is_expired_at(now_ms))
            })
            .collect();

        if stale.is_empty() {
            return Ok(0);
        }
        self.store.remove_members(set_key, &stale).await
    }

    /// Delete the records and markers of a user, except `keep` when given.
    async fn delete_user_sessions(&self, user_id: Uuid, keep: Option<&str>) -> AppResult<()> {
        let set_key = user_sessions_key(user_id);
        let members: Vec<String> = self
            .store
            .members(&set_key)
            .await?
            .into_iter()
            .filter(|raw| match (keep, SessionMarker::parse(raw)) {
                (Some(keep), Some(marker)) => marker.token != keep,
                _ => true,
            })
            .collect();

        let keys: Vec<String> = members
            .iter()
            .filter_map(|raw| SessionMarker::parse(raw))
            .map(|marker| session_key(&marker.token))
            .collect();

        self.store.delete_indexed(&keys, &set_key, &members).await?;
        debug!(user_id = %user_id, deleted = keys.len(), "User sessions deleted");
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for CacheSessionRepository {
    async fn create(&self, session: &RefreshSession) -> AppResult<RefreshSession> {
        let ttl_ms = session.expires_in_ms().max(1) as u64;
        let marker = SessionMarker::new(
            session.refresh_token(),
            session.expires_at().timestamp_millis(),
        );

        self.store
            .set_indexed(
                &session_key(session.refresh_token()),
                &encode(session)?,
                Duration::from_millis(ttl_ms),
                &user_sessions_key(session.user_id()),
                &marker.to_string(),
            )
            .await?;

        debug!(
            user_id = %session.user_id(),
            token = token_hint(session.refresh_token()),
            ttl_ms,
            "Session cached"
        );
        Ok(session.clone())
    }

    async fn get_by_token(&self, token: &str) -> AppResult<Option<RefreshSession>> {
        match self.store.get(&session_key(token)).await? {
            Some(raw) => decode(&raw).map(Some),
            None => Ok(None),
        }
    }

    async fn get_all_by_user(&self, user_id: Uuid) -> AppResult<Vec<RefreshSession>> {
        let now_ms = Utc::now().timestamp_millis();
        let mut tokens: Vec<String> = self
            .store
            .members(&user_sessions_key(user_id))
            .await?
            .iter()
            .filter_map(|raw| SessionMarker::parse(raw))
            .filter(|marker| !marker.is_expired_at(now_ms))
            .map(|marker| marker.token)
            .collect();
        tokens.sort_unstable();
        tokens.dedup();

        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = tokens.iter().map(|t| session_key(t)).collect();
        let mut sessions = Vec::with_capacity(keys.len());
        let records = self.store.get_many(&keys).await?;
        for (token, raw) in tokens.iter().zip(records) {
            let Some(raw) = raw else { continue };
            match decode(&raw) {
                Ok(session) if session.user_id() == user_id => sessions.push(session),
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        user_id = %user_id,
                        token = token_hint(token),
                        error = %e,
                        "Skipping undecodable session record"
                    );
                }
            }
        }

        sessions.sort_by_key(|s| s.created_at());
        Ok(sessions)
    }

    async fn delete_by_token(&self, token: &str) -> AppResult<()> {
        let key = session_key(token);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(());
        };

        let session = match decode(&raw) {
            Ok(session) => session,
            Err(e) => {
                warn!(token = token_hint(token), error = %e, "Dropping undecodable session record");
                return self.store.delete_indexed(&[key], "", &[]).await;
            }
        };

        let set_key = user_sessions_key(session.user_id());
        let markers: Vec<String> = self
            .store
            .members(&set_key)
            .await?
            .into_iter()
            .filter(|raw| SessionMarker::parse(raw).is_some_and(|m| m.token == token))
            .collect();

        self.store.delete_indexed(&[key], &set_key, &markers).await
    }

    async fn delete_all_by_user(&self, user_id: Uuid) -> AppResult<()> {
        self.delete_user_sessions(user_id, None).await
    }

    async fn delete_all_by_user_except(&self, user_id: Uuid, token: &str) -> AppResult<()> {
        self.delete_user_sessions(user_id, Some(token)).await
    }

    /// Each step is applied as it is issued; a cache store cannot group
    /// them, so an abandoned unit keeps whatever already ran.
    async fn begin(&self) -> AppResult<Box<dyn SessionTransaction>> {
        Ok(Box::new(AutoCommit::new(self.clone())))
    }

    async fn reclaim_expired(&self) -> AppResult<u64> {
        let started = Instant::now();
        let now_ms = Utc::now().timestamp_millis();
        let mut pages = KeyPages::new(self.store.as_ref(), user_sessions_pattern(), self.scan_count);
        let mut removed = 0u64;
        let mut sets = 0u64;

        while let Some(page) = pages.next_page().await {
            let keys = match page {
                Ok(keys) => keys,
                Err(e) => {
                    error!(
                        removed,
                        sets,
                        error = %e,
                        "Marker scan failed; reclamation stopped early"
                    );
                    return Err(e);
                }
            };

            for set_key in keys {
                sets += 1;
                match self.reclaim_set(&set_key, now_ms).await {
                    Ok(n) => removed += n,
                    Err(e) => warn!(set_key = %set_key, error = %e, "Skipping marker set"),
                }
            }
        }

        info!(
            removed,
            sets,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Expired session markers reclaimed"
        );
        Ok(removed)
    }
}
