//! Connected server entity model and DTOs.

use serde::Serialize;
use sqlx::FromRow;

use cantata_core::types::{DbId, Timestamp};

/// A row from the `connected_servers` table: a peer this user has
/// outbound access to.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ConnectedServer {
    pub id: DbId,
    pub user_id: DbId,
    pub name: String,
    pub base_url: String,
    /// Bearer token presented on every outbound call. Never serialized
    /// into API responses.
    #[serde(skip_serializing)]
    pub token: String,
    pub is_online: bool,
    pub last_checked_at: Option<Timestamp>,
    pub last_online_at: Option<Timestamp>,
    pub album_count: Option<i32>,
    pub track_count: Option<i32>,
    pub artist_count: Option<i32>,
    pub last_error: Option<String>,
    pub last_error_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting a new connected server after a successful connect.
#[derive(Debug, Clone)]
pub struct CreateConnectedServer {
    pub user_id: DbId,
    pub name: String,
    pub base_url: String,
    pub token: String,
}

/// Remote library counts cached on the server row.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoteCounts {
    pub albums: Option<i32>,
    pub tracks: Option<i32>,
    pub artists: Option<i32>,
}
