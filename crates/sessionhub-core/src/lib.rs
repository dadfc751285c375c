//! # sessionhub-core
//!
//! Core crate for SessionHub. Contains configuration schemas, the
//! store-deadline helper, and the unified error system.
//!
//! This crate has **no** internal dependencies on other SessionHub crates.

pub mod config;
pub mod deadline;
pub mod error;
pub mod redact;
pub mod result;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
