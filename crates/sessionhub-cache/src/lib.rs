//! # sessionhub-cache
//!
//! Key-value store plumbing for refresh sessions. Two stores implement
//! [`CacheStore`]:
//!
//! - **memory**: in-process store using [moka](https://crates.io/crates/moka)
//!   and [dashmap](https://crates.io/crates/dashmap)
//! - **redis**: Redis-backed store using the [redis](https://crates.io/crates/redis) crate
//!
//! [`CacheSessionRepository`] layers the session key layout, per-user
//! marker index and streaming reclamation on top of whichever store the
//! configuration selects.

pub mod keys;
pub mod marker;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;
pub mod session;
pub mod store;

pub use marker::SessionMarker;
pub use provider::CacheManager;
pub use session::CacheSessionRepository;
pub use store::{CacheStore, ScanPage};
