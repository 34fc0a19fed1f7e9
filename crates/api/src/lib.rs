//! HTTP application: the peer-facing federation surface and the local
//! management API, wired over the domain services.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod range;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
pub mod ws;
