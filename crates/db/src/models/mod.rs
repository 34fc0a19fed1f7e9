//! Row models and DTOs, one module per table group.

pub mod access_token;
pub mod connected_server;
pub mod import_job;
pub mod invitation;
pub mod library;
pub mod user;
