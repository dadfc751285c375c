//! # sessionhub-entity
//!
//! Domain entity models for SessionHub and the store contracts that
//! persist them. [`session::RefreshSession`] is a validated value object;
//! [`session::SessionRepository`] and [`user::UserStore`] are implemented
//! by the database and cache crates.

pub mod session;
pub mod user;
