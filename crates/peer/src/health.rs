//! Write-back of observed peer state onto the `connected_servers` row.
//!
//! This module is the only code path that flips a server's `is_online`
//! bit. Every outbound operation funnels its outcome through
//! [`record_success`] / [`record_failure`], so the row always reflects
//! the most recent real contact.

use sqlx::PgPool;

use cantata_core::types::DbId;
use cantata_db::models::connected_server::RemoteCounts;
use cantata_db::repositories::ConnectedServerRepo;

use crate::api::ServerInfo;
use crate::client::PeerClient;
use crate::error::PeerError;

/// Mark the server online and refresh its cached remote counts.
pub async fn record_success(
    pool: &PgPool,
    server_id: DbId,
    info: Option<&ServerInfo>,
) -> Result<(), sqlx::Error> {
    let counts = match info {
        Some(info) => RemoteCounts {
            albums: Some(info.album_count as i32),
            tracks: Some(info.track_count as i32),
            artists: Some(info.artist_count as i32),
        },
        None => RemoteCounts::default(),
    };
    ConnectedServerRepo::mark_online(pool, server_id, counts).await
}

/// Record a classified failure on the server row.
///
/// Only transport failures flip the online bit — an HTTP-level error
/// means the peer answered, and the caller surfaces it directly.
pub async fn record_failure(
    pool: &PgPool,
    server_id: DbId,
    error: &PeerError,
) -> Result<(), sqlx::Error> {
    if error.is_transport() {
        ConnectedServerRepo::mark_offline(pool, server_id, &error.to_string()).await
    } else {
        ConnectedServerRepo::mark_online(pool, server_id, RemoteCounts::default()).await
    }
}

/// Probe a server and sync its row: ping + info on success, classified
/// error on failure. Returns the refreshed info when the peer answered.
pub async fn check_server(
    pool: &PgPool,
    server_id: DbId,
    client: &PeerClient,
) -> Result<Option<ServerInfo>, sqlx::Error> {
    match client.server_info().await {
        Ok(info) => {
            record_success(pool, server_id, Some(&info)).await?;
            tracing::debug!(server_id, albums = info.album_count, "peer online");
            Ok(Some(info))
        }
        Err(err) => {
            tracing::warn!(server_id, error = %err, "peer health check failed");
            record_failure(pool, server_id, &err).await?;
            Ok(None)
        }
    }
}
