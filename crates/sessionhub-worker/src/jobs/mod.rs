//! Built-in job implementations.

pub mod reclaim;

pub use reclaim::ReclaimJob;
