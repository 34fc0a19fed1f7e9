//! Error type for import operations.

use cantata_core::error::CoreError;
use cantata_peer::PeerError;

/// Errors surfaced by [`ImportService`](crate::ImportService).
///
/// The `Display` text of the active variant is what gets persisted as a
/// failed job's `error_message`, so every variant renders as something a
/// user can act on.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A call to the source peer failed.
    #[error(transparent)]
    Peer(#[from] PeerError),

    #[error("File error: {0}")]
    Io(#[from] std::io::Error),
}

impl ImportError {
    pub fn not_found(entity: &'static str, id: cantata_core::types::DbId) -> Self {
        ImportError::Core(CoreError::NotFound { entity, id })
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ImportError::Core(CoreError::Conflict(message.into()))
    }
}
