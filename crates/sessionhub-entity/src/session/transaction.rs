//! Units of work over a session store.

use async_trait::async_trait;
use uuid::Uuid;

use sessionhub_core::result::AppResult;

use super::model::RefreshSession;
use super::repository::SessionRepository;

/// The writes of one use case, applied together.
///
/// Dropping a transaction without [`SessionTransaction::commit`] abandons
/// it. A relational store rolls back; a store without multi-key
/// transactions may already have applied earlier steps.
#[async_trait]
pub trait SessionTransaction: Send {
    /// All sessions of a user, oldest first.
    async fn get_all_by_user(&mut self, user_id: Uuid) -> AppResult<Vec<RefreshSession>>;

    /// Persist a new session.
    async fn create(&mut self, session: &RefreshSession) -> AppResult<RefreshSession>;

    /// Delete one session. Unknown tokens are ignored.
    async fn delete_by_token(&mut self, token: &str) -> AppResult<()>;

    /// Delete every session of a user.
    async fn delete_all_by_user(&mut self, user_id: Uuid) -> AppResult<()>;

    /// Make every write of this unit visible.
    async fn commit(self: Box<Self>) -> AppResult<()>;
}

/// Forwards each call to a repository as it happens; commit is a no-op.
///
/// For stores whose single operations are atomic but which cannot group
/// several of them.
#[derive(Debug, Clone)]
pub struct AutoCommit<R> {
    repo: R,
}

impl<R> AutoCommit<R> {
    /// Wrap `repo`.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl<R: SessionRepository + Clone> SessionTransaction for AutoCommit<R> {
    async fn get_all_by_user(&mut self, user_id: Uuid) -> AppResult<Vec<RefreshSession>> {
        self.repo.get_all_by_user(user_id).await
    }

    async fn create(&mut self, session: &RefreshSession) -> AppResult<RefreshSession> {
        self.repo.create(session).await
    }

    async fn delete_by_token(&mut self, token: &str) -> AppResult<()> {
        self.repo.delete_by_token(token).await
    }

    async fn delete_all_by_user(&mut self, user_id: Uuid) -> AppResult<()> {
        self.repo.delete_all_by_user(user_id).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}
