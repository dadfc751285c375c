//! User domain entities.

pub mod model;
pub mod store;

pub use model::{CreateUser, User, normalize_email};
pub use store::UserStore;
