//! Outbound HTTP client for talking to peer federation endpoints.
//!
//! [`PeerClient`] wraps [`reqwest`] with normalized base URLs, bearer
//! authentication, per-request timeouts, and a small error taxonomy so
//! callers can report something actionable instead of a raw transport
//! error. [`health`] writes the observed peer state back onto the
//! `connected_servers` row.

pub mod api;
pub mod client;
pub mod error;
pub mod health;

pub use client::PeerClient;
pub use error::PeerError;
