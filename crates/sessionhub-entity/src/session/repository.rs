//! Storage-agnostic refresh-session contract.

use async_trait::async_trait;
use uuid::Uuid;

use sessionhub_core::result::AppResult;

use super::model::RefreshSession;
use super::transaction::SessionTransaction;

/// Persistence contract for refresh sessions.
///
/// Implemented by the PostgreSQL repository and by the cache-store
/// repository; exactly one is bound at startup. Absence is reported as
/// `None` or an empty vector, never as an error. Every `Err` is a backend
/// failure (`StoreUnavailable`), a payload problem, or a unique-token
/// `Conflict` on create.
#[async_trait]
pub trait SessionRepository: Send + Sync + std::fmt::Debug + 'static {
    /// Persist a new session and return it as stored.
    async fn create(&self, session: &RefreshSession) -> AppResult<RefreshSession>;

    /// Look up a session by its refresh token.
    async fn get_by_token(&self, token: &str) -> AppResult<Option<RefreshSession>>;

    /// All live sessions of a user, oldest first.
    async fn get_all_by_user(&self, user_id: Uuid) -> AppResult<Vec<RefreshSession>>;

    /// Delete one session. Deleting an unknown token is not an error.
    async fn delete_by_token(&self, token: &str) -> AppResult<()>;

    /// Delete every session of a user.
    async fn delete_all_by_user(&self, user_id: Uuid) -> AppResult<()>;

    /// Delete every session of a user except the one holding `token`.
    async fn delete_all_by_user_except(&self, user_id: Uuid, token: &str) -> AppResult<()>;

    /// Open a unit of work for a multi-step use case.
    async fn begin(&self) -> AppResult<Box<dyn SessionTransaction>>;

    /// Best-effort removal of expired session bookkeeping. Returns how many
    /// entries were removed.
    async fn reclaim_expired(&self) -> AppResult<u64>;
}
