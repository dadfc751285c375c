//! Refresh-session entity model.

use std::net::IpAddr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use sessionhub_core::error::{AppError, ErrorKind};
use sessionhub_core::result::AppResult;

/// Unvalidated field values for a refresh session.
///
/// A draft never escapes as a session: it is checked as a whole by
/// [`RefreshSession::issue`] or [`RefreshSession::restore`], and every
/// violated rule is reported in a single `Validation` error.
#[derive(Debug, Clone, Validate)]
pub struct SessionDraft {
    /// Owner of the session.
    #[validate(custom(function = "validate_user_id"))]
    pub user_id: Uuid,
    /// Opaque single-use bearer secret.
    #[validate(length(min = 1, max = 512))]
    pub refresh_token: String,
    /// Client-supplied device fingerprint.
    #[validate(length(min = 1, max = 255))]
    pub fingerprint: String,
    /// IPv4 or IPv6 literal of the client.
    #[validate(ip)]
    pub ip_address: String,
    /// User-Agent header value.
    #[validate(length(min = 1, max = 255))]
    pub user_agent: Option<String>,
}

fn validate_user_id(user_id: &Uuid) -> Result<(), ValidationError> {
    if user_id.is_nil() {
        return Err(ValidationError::new("nil_user_id"));
    }
    Ok(())
}

/// A refresh session backing short-lived access tokens.
///
/// Sessions are immutable once built. Rotation deletes the old session
/// and issues a new one; nothing is ever updated in place. Timestamps are
/// held at millisecond precision so every store round-trips them exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshSession {
    id: Option<Uuid>,
    user_id: Uuid,
    refresh_token: String,
    fingerprint: String,
    ip_address: IpAddr,
    user_agent: Option<String>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl RefreshSession {
    /// Build a brand-new session that lives for `lifetime` from now.
    pub fn issue(draft: SessionDraft, lifetime: chrono::Duration) -> AppResult<Self> {
        let now = Utc::now().trunc_subsecs(3);
        Self::build(draft, None, now + lifetime, now)
    }

    /// Rehydrate a session read back from a store.
    ///
    /// The same field rules apply as for [`RefreshSession::issue`]; a
    /// stored record that violates them is reported, not silently accepted.
    pub fn restore(
        draft: SessionDraft,
        id: Option<Uuid>,
        expires_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        Self::build(
            draft,
            id,
            expires_at.trunc_subsecs(3),
            created_at.trunc_subsecs(3),
        )
    }

    fn build(
        draft: SessionDraft,
        id: Option<Uuid>,
        expires_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        draft.validate().map_err(|errors| {
            AppError::with_source(
                ErrorKind::Validation,
                format!("Invalid refresh session: {errors}"),
                errors,
            )
        })?;

        let ip_address = draft.ip_address.parse::<IpAddr>().map_err(|e| {
            AppError::with_source(
                ErrorKind::Validation,
                format!("Invalid refresh session: ip_address: {e}"),
                e,
            )
        })?;

        Ok(Self {
            id,
            user_id: draft.user_id,
            refresh_token: draft.refresh_token,
            fingerprint: draft.fingerprint,
            ip_address,
            user_agent: draft.user_agent,
            expires_at,
            created_at,
        })
    }

    /// Store-assigned identifier, absent until persisted by a store that
    /// assigns one.
    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    /// Owner of the session.
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// The bearer secret.
    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    /// Device fingerprint.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Client address.
    pub fn ip_address(&self) -> IpAddr {
        self.ip_address
    }

    /// User-Agent header, if the client sent one.
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Absolute expiry.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Creation time, used for oldest-first ordering.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether the session has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Whether the session is expired at `now`. The boundary counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Milliseconds until expiry; negative once expired.
    pub fn expires_in_ms(&self) -> i64 {
        self.expires_in_ms_at(Utc::now())
    }

    /// Milliseconds from `now` until expiry.
    pub fn expires_in_ms_at(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_milliseconds()
    }

    /// Copy of the session fields as a draft, e.g. to re-encode for a store.
    pub fn to_draft(&self) -> SessionDraft {
        SessionDraft {
            user_id: self.user_id,
            refresh_token: self.refresh_token.clone(),
            fingerprint: self.fingerprint.clone(),
            ip_address: self.ip_address.to_string(),
            user_agent: self.user_agent.clone(),
        }
    }
}
