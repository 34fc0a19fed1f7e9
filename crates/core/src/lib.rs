//! Domain logic shared by every Cantata crate.
//!
//! This crate has no internal dependencies and no I/O. It holds the shared
//! id/timestamp aliases, the error taxonomy, token generation, permission
//! records, URL and filesystem-name validation, and the import-job state
//! machine.

pub mod error;
pub mod fsnames;
pub mod import;
pub mod permissions;
pub mod token;
pub mod types;
pub mod urls;
