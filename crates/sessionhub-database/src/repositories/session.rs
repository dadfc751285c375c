//! PostgreSQL refresh-session repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgExecutor, PgPool, Postgres, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use sessionhub_core::error::AppError;
use sessionhub_core::result::AppResult;
use sessionhub_entity::session::{
    RefreshSession, SessionDraft, SessionRepository, SessionTransaction,
};

use super::{is_unique_violation, store_error};

/// A `refresh_sessions` row as read from the database.
#[derive(Debug, FromRow)]
struct SessionRow {
    id: Uuid,
    user_id: Uuid,
    refresh_token: String,
    fingerprint: String,
    ip_address: String,
    user_agent: Option<String>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl SessionRow {
    fn into_session(self) -> AppResult<RefreshSession> {
        RefreshSession::restore(
            SessionDraft {
                user_id: self.user_id,
                refresh_token: self.refresh_token,
                fingerprint: self.fingerprint,
                ip_address: self.ip_address,
                user_agent: self.user_agent,
            },
            Some(self.id),
            self.expires_at,
            self.created_at,
        )
    }
}

const SESSION_COLUMNS: &str =
    "id, user_id, refresh_token, fingerprint, ip_address, user_agent, expires_at, created_at";

async fn insert<'e, E: PgExecutor<'e>>(
    exec: E,
    session: &RefreshSession,
) -> AppResult<RefreshSession> {
    let id = session.id().unwrap_or_else(Uuid::new_v4);
    let row = sqlx::query_as::<_, SessionRow>(&format!(
        "INSERT INTO refresh_sessions ({SESSION_COLUMNS}) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING {SESSION_COLUMNS}"
    ))
    .bind(id)
    .bind(session.user_id())
    .bind(session.refresh_token())
    .bind(session.fingerprint())
    .bind(session.ip_address().to_string())
    .bind(session.user_agent())
    .bind(session.expires_at())
    .bind(session.created_at())
    .fetch_one(exec)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::conflict("Refresh token already exists")
        } else {
            store_error("Failed to create session", e)
        }
    })?;

    debug!(session_id = %id, user_id = %session.user_id(), "Session row inserted");
    row.into_session()
}

async fn select_by_user<'e, E: PgExecutor<'e>>(
    exec: E,
    user_id: Uuid,
    for_update: bool,
) -> AppResult<Vec<RefreshSession>> {
    let lock = if for_update { " FOR UPDATE" } else { "" };
    let rows = sqlx::query_as::<_, SessionRow>(&format!(
        "SELECT {SESSION_COLUMNS} FROM refresh_sessions \
         WHERE user_id = $1 ORDER BY created_at ASC, id ASC{lock}"
    ))
    .bind(user_id)
    .fetch_all(exec)
    .await
    .map_err(|e| store_error("Failed to list user sessions", e))?;

    rows.into_iter().map(SessionRow::into_session).collect()
}

async fn delete_token<'e, E: PgExecutor<'e>>(exec: E, token: &str) -> AppResult<()> {
    sqlx::query("DELETE FROM refresh_sessions WHERE refresh_token = $1")
        .bind(token)
        .execute(exec)
        .await
        .map_err(|e| store_error("Failed to delete session", e))?;
    Ok(())
}

async fn delete_user<'e, E: PgExecutor<'e>>(exec: E, user_id: Uuid) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM refresh_sessions WHERE user_id = $1")
        .bind(user_id)
        .execute(exec)
        .await
        .map_err(|e| store_error("Failed to delete user sessions", e))?;
    debug!(user_id = %user_id, deleted = result.rows_affected(), "User sessions deleted");
    Ok(())
}

/// Refresh sessions held in the `refresh_sessions` table.
///
/// The table is the source of truth: expired rows stay readable until
/// [`SessionRepository::reclaim_expired`] deletes them, and callers check
/// expiry themselves.
#[derive(Debug, Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    /// Create a new session repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn create(&self, session: &RefreshSession) -> AppResult<RefreshSession> {
        insert(&self.pool, session).await
    }

    async fn get_by_token(&self, token: &str) -> AppResult<Option<RefreshSession>> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM refresh_sessions WHERE refresh_token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to find session by token", e))?;

        row.map(SessionRow::into_session).transpose()
    }

    async fn get_all_by_user(&self, user_id: Uuid) -> AppResult<Vec<RefreshSession>> {
        select_by_user(&self.pool, user_id, false).await
    }

    async fn delete_by_token(&self, token: &str) -> AppResult<()> {
        delete_token(&self.pool, token).await
    }

    async fn delete_all_by_user(&self, user_id: Uuid) -> AppResult<()> {
        delete_user(&self.pool, user_id).await
    }

    async fn delete_all_by_user_except(&self, user_id: Uuid, token: &str) -> AppResult<()> {
        let result = sqlx::query(
            "DELETE FROM refresh_sessions WHERE user_id = $1 AND refresh_token <> $2",
        )
        .bind(user_id)
        .bind(token)
        .execute(&self.pool)
        .await
        .map_err(|e| store_error("Failed to delete other user sessions", e))?;
        debug!(user_id = %user_id, deleted = result.rows_affected(), "Other user sessions deleted");
        Ok(())
    }

    async fn begin(&self) -> AppResult<Box<dyn SessionTransaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| store_error("Failed to begin transaction", e))?;
        Ok(Box::new(PgSessionTransaction { tx }))
    }

    async fn reclaim_expired(&self) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_sessions WHERE expires_at < $1")
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("Failed to delete expired sessions", e))?;

        let removed = result.rows_affected();
        if removed > 0 {
            info!(removed, "Expired session rows deleted");
        }
        Ok(removed)
    }
}

/// A database transaction over `refresh_sessions`.
///
/// Listing a user's sessions locks their rows until commit, so concurrent
/// logins of a user with existing sessions queue behind each other.
/// Dropping the value without commit rolls back.
pub struct PgSessionTransaction {
    tx: Transaction<'static, Postgres>,
}

impl std::fmt::Debug for PgSessionTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgSessionTransaction").finish_non_exhaustive()
    }
}

#[async_trait]
impl SessionTransaction for PgSessionTransaction {
    async fn get_all_by_user(&mut self, user_id: Uuid) -> AppResult<Vec<RefreshSession>> {
        select_by_user(&mut *self.tx, user_id, true).await
    }

    async fn create(&mut self, session: &RefreshSession) -> AppResult<RefreshSession> {
        insert(&mut *self.tx, session).await
    }

    async fn delete_by_token(&mut self, token: &str) -> AppResult<()> {
        delete_token(&mut *self.tx, token).await
    }

    async fn delete_all_by_user(&mut self, user_id: Uuid) -> AppResult<()> {
        delete_user(&mut *self.tx, user_id).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| store_error("Failed to commit transaction", e))
    }
}
