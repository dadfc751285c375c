//! Cache key builders for session entries.
//!
//! Keys are relative; a store may prepend its own configured prefix.

use uuid::Uuid;

/// Prefix of primary session records.
pub const SESSION_PREFIX: &str = "session:";

/// Prefix of per-user marker sets.
pub const USER_SESSIONS_PREFIX: &str = "user_sessions:";

/// Primary record key for a refresh token.
pub fn session_key(token: &str) -> String {
    format!("{SESSION_PREFIX}{token}")
}

/// Marker set key for a user.
pub fn user_sessions_key(user_id: Uuid) -> String {
    format!("{USER_SESSIONS_PREFIX}{user_id}")
}

/// Glob matching every marker set.
pub fn user_sessions_pattern() -> String {
    format!("{USER_SESSIONS_PREFIX}*")
}
