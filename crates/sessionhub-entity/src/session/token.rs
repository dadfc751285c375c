//! Request context and issued-token value types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::model::SessionDraft;

/// Device facts supplied with every session-creating call.
///
/// Carries the same field rules as [`SessionDraft`] so a bad context is
/// rejected before any store is touched.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ClientContext {
    /// Client-supplied device/browser fingerprint.
    #[validate(length(min = 1, max = 255))]
    pub fingerprint: String,
    /// Client IP address literal.
    #[validate(ip)]
    pub ip_address: String,
    /// User-Agent header, if present.
    #[validate(length(min = 1, max = 255))]
    pub user_agent: Option<String>,
}

impl ClientContext {
    /// Convenience constructor.
    pub fn new(
        fingerprint: impl Into<String>,
        ip_address: impl Into<String>,
        user_agent: Option<String>,
    ) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            ip_address: ip_address.into(),
            user_agent,
        }
    }

    /// Draft of a session for `user_id` on this device.
    pub fn draft(&self, user_id: Uuid, refresh_token: String) -> SessionDraft {
        SessionDraft {
            user_id,
            refresh_token,
            fingerprint: self.fingerprint.clone(),
            ip_address: self.ip_address.clone(),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// The pair returned by every issuing operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedTokens {
    /// Signed short-lived access token.
    pub access_token: String,
    /// Opaque refresh token backing a stored session.
    pub refresh_token: String,
    /// Milliseconds until the refresh session expires.
    pub expires_in_ms: i64,
}
