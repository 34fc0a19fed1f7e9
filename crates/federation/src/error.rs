//! Error type for federation service operations.

use cantata_core::error::CoreError;
use cantata_peer::PeerError;

/// Errors surfaced by [`TokenService`](crate::TokenService) and
/// [`ServerConnector`](crate::ServerConnector).
#[derive(Debug, thiserror::Error)]
pub enum FederationError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A call to a remote peer failed.
    #[error(transparent)]
    Peer(#[from] PeerError),
}

impl FederationError {
    /// Shorthand for a not-found error on the given entity.
    pub fn not_found(entity: &'static str, id: cantata_core::types::DbId) -> Self {
        FederationError::Core(CoreError::NotFound { entity, id })
    }
}
