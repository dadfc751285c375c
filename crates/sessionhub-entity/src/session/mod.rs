//! Refresh-session domain entities.

pub mod model;
pub mod repository;
pub mod token;
pub mod transaction;

pub use model::{RefreshSession, SessionDraft};
pub use repository::SessionRepository;
pub use token::{ClientContext, IssuedTokens};
pub use transaction::{AutoCommit, SessionTransaction};
