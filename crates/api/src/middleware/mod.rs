//! Request extractors: JWT local-user auth and bearer peer auth.

pub mod auth;
pub mod peer;
