//! Refresh-session orchestration.

pub mod service;

pub use service::TokenService;
