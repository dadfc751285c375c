//! # sessionhub-database
//!
//! PostgreSQL connection management, migrations, and the relational
//! implementations of the session and user store contracts.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use repositories::{PgSessionRepository, PgUserRepository};
