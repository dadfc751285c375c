//! Scheduled background jobs for SessionHub.
//!
//! This crate provides:
//! - A cron scheduler that drives periodic jobs
//! - The expired-session reclamation job

pub mod jobs;
pub mod scheduler;

pub use jobs::ReclaimJob;
pub use scheduler::CronScheduler;
