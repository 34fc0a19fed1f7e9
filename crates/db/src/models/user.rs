//! Local user rows. User administration itself lives outside this system;
//! only the minimal record other tables reference is modeled here.

use serde::Serialize;
use sqlx::FromRow;

use cantata_core::types::{DbId, Timestamp};

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub username: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
