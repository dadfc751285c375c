//! Per-user index entries.

use std::fmt;

/// One entry of a `user_sessions:{userId}` set: `{token}:{expiresAtEpochMs}`.
///
/// The expiry travels with the member so reclamation can drop stale
/// entries without reading the primary record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMarker {
    /// Refresh token the marker points at.
    pub token: String,
    /// Session expiry in epoch milliseconds.
    pub expires_at_ms: i64,
}

impl SessionMarker {
    /// Create a marker.
    pub fn new(token: impl Into<String>, expires_at_ms: i64) -> Self {
        Self {
            token: token.into(),
            expires_at_ms,
        }
    }

    /// Parse a raw set member. Returns `None` for anything malformed.
    pub fn parse(raw: &str) -> Option<Self> {
        let (token, ms) = raw.rsplit_once(':')?;
        if token.is_empty() {
            return None;
        }
        let expires_at_ms = ms.parse::<i64>().ok()?;
        Some(Self::new(token, expires_at_ms))
    }

    /// Whether the marked session is expired at `now_ms`.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at_ms
    }
}

impl fmt::Display for SessionMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.token, self.expires_at_ms)
    }
}
