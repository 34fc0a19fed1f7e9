//! Album import orchestrator.
//!
//! Pulls whole albums from connected peers onto the local disk and into
//! the local library tables, with a bounded number of simultaneous
//! downloads, cooperative cancellation at track boundaries, and a startup
//! sweep that fails any job a dead process left `downloading`.

mod download;
mod error;
mod scheduler;
mod service;

pub use error::ImportError;
pub use scheduler::SchedulerState;
pub use service::{ImportService, ImporterConfig, DEFAULT_MAX_CONCURRENT};
