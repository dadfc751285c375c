//! Relational repository implementations.

pub mod session;
pub mod user;

pub use session::{PgSessionRepository, PgSessionTransaction};
pub use user::PgUserRepository;

use sessionhub_core::error::{AppError, ErrorKind};

/// Map a driver error to `StoreUnavailable`, keeping the cause.
pub(crate) fn store_error(context: &str, err: sqlx::Error) -> AppError {
    AppError::with_source(ErrorKind::StoreUnavailable, format!("{context}: {err}"), err)
}

/// Whether a driver error is a unique-constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}
