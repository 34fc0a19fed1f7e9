//! HTTP handlers, one module per area.

pub mod federation;
pub mod health;
pub mod imports;
pub mod invitations;
pub mod servers;
pub mod tokens;
