//! User persistence contract consumed by the token service.

use async_trait::async_trait;
use uuid::Uuid;

use sessionhub_core::result::AppResult;

use super::model::{CreateUser, User};

/// Account lookups and credential updates.
#[async_trait]
pub trait UserStore: Send + Sync + std::fmt::Debug + 'static {
    /// Find a user by (normalized) email.
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Find a user by ID.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Create a user. A taken email is a `Conflict`.
    async fn create(&self, data: &CreateUser) -> AppResult<User>;

    /// Replace the stored password hash.
    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> AppResult<()>;

    /// Delete a user. Returns `true` if a row was removed.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}
