//! Token service: login, registration, rotation, and logout flows.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use sessionhub_core::config::{AuthConfig, SessionConfig};
use sessionhub_core::deadline::with_deadline;
use sessionhub_core::error::{AppError, ErrorKind};
use sessionhub_core::redact::token_hint;
use sessionhub_core::result::AppResult;
use sessionhub_entity::session::{
    ClientContext, IssuedTokens, RefreshSession, SessionRepository, SessionTransaction,
};
use sessionhub_entity::user::{CreateUser, User, UserStore, normalize_email};

use crate::jwt::{AccessTokenSigner, Claims};
use crate::password::CredentialVerifier;

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const INVALID_REFRESH: &str = "Invalid or expired refresh token";

#[derive(Debug, Validate)]
struct Signup {
    #[validate(email)]
    email: String,
    #[validate(length(min = 8, max = 128))]
    password: String,
}

#[derive(Debug, Validate)]
struct NewPassword {
    #[validate(length(min = 8, max = 128))]
    password: String,
}

fn check<T: Validate>(input: &T) -> AppResult<()> {
    input.validate().map_err(|errors| {
        AppError::with_source(
            ErrorKind::Validation,
            format!("Invalid input: {errors}"),
            errors,
        )
    })
}

/// What happens to a user's existing sessions when a new one opens.
#[derive(Debug, Clone, Copy)]
enum Prior<'a> {
    /// Keep them, subject to device replacement and the cap.
    Keep,
    /// Consume the presented refresh token first.
    Consume(&'a str),
    /// Delete all of them.
    Reset,
}

/// Opaque 256-bit refresh secret, hex encoded.
fn new_refresh_token() -> String {
    format!(
        "{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

/// Orchestrates refresh sessions and access tokens.
///
/// Every call into a store runs under the configured store deadline. The
/// per-user session cap is enforced on a best-effort basis: two concurrent
/// logins for the same user may both pass the count check and briefly
/// exceed it until the next login evicts.
#[derive(Debug, Clone)]
pub struct TokenService {
    sessions: Arc<dyn SessionRepository>,
    users: Arc<dyn UserStore>,
    verifier: Arc<dyn CredentialVerifier>,
    signer: Arc<dyn AccessTokenSigner>,
    config: SessionConfig,
    access_ttl: chrono::Duration,
}

impl TokenService {
    /// Wire the service to its stores and credential collaborators.
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        users: Arc<dyn UserStore>,
        verifier: Arc<dyn CredentialVerifier>,
        signer: Arc<dyn AccessTokenSigner>,
        config: SessionConfig,
        auth: &AuthConfig,
    ) -> Self {
        Self {
            sessions,
            users,
            verifier,
            signer,
            config,
            access_ttl: chrono::Duration::minutes(auth.jwt_access_ttl_minutes as i64),
        }
    }

    async fn store<T>(
        &self,
        operation: &str,
        fut: impl Future<Output = AppResult<T>>,
    ) -> AppResult<T> {
        with_deadline(self.config.store_timeout(), operation, fut).await
    }

    /// Authenticate with email and password and open a session for the device.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        ctx: &ClientContext,
    ) -> AppResult<IssuedTokens> {
        check(ctx)?;
        let email = normalize_email(email);
        let user = self
            .store("users.find_by_email", self.users.find_by_email(&email))
            .await?
            .ok_or_else(|| AppError::unauthorized(INVALID_CREDENTIALS))?;

        if !self.verifier.verify(password, &user.password_hash)? {
            warn!(user_id = %user.id, "Login rejected: bad password");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        }

        let tokens = self.open_session(user.id, ctx, Prior::Keep).await?;
        info!(user_id = %user.id, fingerprint = %ctx.fingerprint, "Login successful");
        Ok(tokens)
    }

    /// Create an account and open its first session.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<String>,
        ctx: &ClientContext,
    ) -> AppResult<IssuedTokens> {
        let signup = Signup {
            email: normalize_email(email),
            password: password.to_string(),
        };
        check(&signup)?;
        check(ctx)?;

        let password_hash = self.verifier.hash(&signup.password)?;
        let user = self
            .store(
                "users.create",
                self.users.create(&CreateUser {
                    email: signup.email,
                    display_name,
                    password_hash,
                }),
            )
            .await?;

        let tokens = self.open_session(user.id, ctx, Prior::Keep).await?;
        info!(user_id = %user.id, "User registered");
        Ok(tokens)
    }

    /// Exchange a refresh token for a new token pair. The presented token
    /// is consumed.
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
        ctx: &ClientContext,
    ) -> AppResult<IssuedTokens> {
        check(ctx)?;
        let session = self
            .store("sessions.get_by_token", self.sessions.get_by_token(refresh_token))
            .await?
            .ok_or_else(|| AppError::unauthorized(INVALID_REFRESH))?;

        if session.is_expired() {
            debug!(
                user_id = %session.user_id(),
                token = token_hint(refresh_token),
                "Refresh rejected: session expired"
            );
            return Err(AppError::unauthorized(INVALID_REFRESH));
        }

        let tokens = self
            .open_session(session.user_id(), ctx, Prior::Consume(refresh_token))
            .await?;
        debug!(user_id = %session.user_id(), "Refresh token rotated");
        Ok(tokens)
    }

    /// End the session holding `refresh_token`. Unknown tokens are accepted.
    pub async fn logout(&self, refresh_token: &str) -> AppResult<()> {
        self.store(
            "sessions.delete_by_token",
            self.sessions.delete_by_token(refresh_token),
        )
        .await?;
        debug!(token = token_hint(refresh_token), "Logged out");
        Ok(())
    }

    /// End every session of `user_id` except the caller's own.
    pub async fn logout_all_except_current(
        &self,
        user_id: Uuid,
        current_refresh_token: &str,
    ) -> AppResult<()> {
        self.store(
            "sessions.delete_all_by_user_except",
            self.sessions
                .delete_all_by_user_except(user_id, current_refresh_token),
        )
        .await?;
        info!(user_id = %user_id, "Other sessions logged out");
        Ok(())
    }

    /// Replace the password, end every session, and open a fresh one for
    /// the calling device.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
        ctx: &ClientContext,
    ) -> AppResult<IssuedTokens> {
        check(&NewPassword {
            password: new_password.to_string(),
        })?;
        check(ctx)?;

        let user = self.authenticate(user_id, current_password).await?;
        let password_hash = self.verifier.hash(new_password)?;
        self.store(
            "users.update_password_hash",
            self.users.update_password_hash(user.id, &password_hash),
        )
        .await?;

        let tokens = self.open_session(user.id, ctx, Prior::Reset).await?;
        info!(user_id = %user.id, "Password changed; all sessions reset");
        Ok(tokens)
    }

    /// Live sessions of a user, oldest first.
    pub async fn list_sessions(&self, user_id: Uuid) -> AppResult<Vec<RefreshSession>> {
        let sessions = self
            .store(
                "sessions.get_all_by_user",
                self.sessions.get_all_by_user(user_id),
            )
            .await?;
        Ok(sessions.into_iter().filter(|s| !s.is_expired()).collect())
    }

    /// Delete an account after re-checking its password.
    pub async fn delete_account(&self, user_id: Uuid, password: &str) -> AppResult<()> {
        let user = self.authenticate(user_id, password).await?;

        self.store(
            "sessions.delete_all_by_user",
            self.sessions.delete_all_by_user(user.id),
        )
        .await?;
        self.store("users.delete", self.users.delete(user.id)).await?;

        info!(user_id = %user.id, "Account deleted");
        Ok(())
    }

    async fn authenticate(&self, user_id: Uuid, password: &str) -> AppResult<User> {
        let user = self
            .store("users.find_by_id", self.users.find_by_id(user_id))
            .await?
            .ok_or_else(|| AppError::unauthorized(INVALID_CREDENTIALS))?;

        if !self.verifier.verify(password, &user.password_hash)? {
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        }
        Ok(user)
    }

    /// Open a session for the device inside one unit of work.
    ///
    /// The session is built and validated before anything is written.
    /// Then `prior` is applied, the device's previous session is replaced,
    /// the oldest sessions are evicted to make room under the cap, and the
    /// new session is created. The unit commits only after the access
    /// token is signed.
    async fn open_session(
        &self,
        user_id: Uuid,
        ctx: &ClientContext,
        prior: Prior<'_>,
    ) -> AppResult<IssuedTokens> {
        let session = RefreshSession::issue(
            ctx.draft(user_id, new_refresh_token()),
            self.config.refresh_ttl(),
        )?;
        let access_token = self
            .signer
            .sign(&Claims::access(user_id, self.access_ttl))?;

        let mut tx = self.store("sessions.begin", self.sessions.begin()).await?;
        match prior {
            Prior::Keep => {}
            Prior::Consume(token) => {
                self.store("sessions.delete_by_token", tx.delete_by_token(token))
                    .await?;
            }
            Prior::Reset => {
                self.store(
                    "sessions.delete_all_by_user",
                    tx.delete_all_by_user(user_id),
                )
                .await?;
            }
        }
        if !matches!(prior, Prior::Reset) {
            self.make_room(tx.as_mut(), user_id, &ctx.fingerprint).await?;
        }

        let stored = self.store("sessions.create", tx.create(&session)).await?;
        self.store("sessions.commit", tx.commit()).await?;

        Ok(IssuedTokens {
            access_token,
            refresh_token: stored.refresh_token().to_string(),
            expires_in_ms: stored.expires_in_ms(),
        })
    }

    /// Delete the device's previous session and evict the oldest others
    /// until one slot is free under the cap.
    async fn make_room(
        &self,
        tx: &mut dyn SessionTransaction,
        user_id: Uuid,
        fingerprint: &str,
    ) -> AppResult<()> {
        let existing = self
            .store("sessions.get_all_by_user", tx.get_all_by_user(user_id))
            .await?;

        let mut remaining = Vec::with_capacity(existing.len());
        for session in existing {
            if session.fingerprint() == fingerprint {
                self.store(
                    "sessions.delete_by_token",
                    tx.delete_by_token(session.refresh_token()),
                )
                .await?;
                debug!(user_id = %user_id, "Replaced session for same fingerprint");
            } else {
                remaining.push(session);
            }
        }

        let cap = self.config.max_sessions_per_user.max(1);
        if remaining.len() >= cap {
            let excess = remaining.len() + 1 - cap;
            for oldest in remaining.iter().take(excess) {
                self.store(
                    "sessions.delete_by_token",
                    tx.delete_by_token(oldest.refresh_token()),
                )
                .await?;
                info!(
                    user_id = %user_id,
                    created_at = %oldest.created_at(),
                    "Evicted oldest session"
                );
            }
        }
        Ok(())
    }
}
