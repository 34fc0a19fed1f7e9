//! Album import job entity model and DTOs.

use serde::Serialize;
use sqlx::FromRow;

use cantata_core::error::CoreError;
use cantata_core::import::ImportStatus;
use cantata_core::types::{DbId, Timestamp};

/// A row from the `import_jobs` table. One row per import attempt;
/// rows are user-visible history and are never deleted automatically.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ImportJob {
    pub id: DbId,
    pub user_id: DbId,
    pub server_id: Option<DbId>,
    pub remote_album_id: String,
    pub album_name: String,
    pub artist_name: String,
    pub status: String,
    pub progress: i32,
    pub total_tracks: i32,
    pub downloaded_tracks: i32,
    pub total_size: i64,
    pub downloaded_size: i64,
    pub error_message: Option<String>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ImportJob {
    /// Parse the stored status string into the typed state machine.
    pub fn import_status(&self) -> Result<ImportStatus, CoreError> {
        ImportStatus::parse(&self.status)
    }
}

/// DTO for inserting a new import job in `pending`.
#[derive(Debug, Clone)]
pub struct CreateImportJob {
    pub user_id: DbId,
    pub server_id: DbId,
    pub remote_album_id: String,
    pub album_name: String,
    pub artist_name: String,
    pub total_tracks: i32,
    pub total_size: i64,
}
