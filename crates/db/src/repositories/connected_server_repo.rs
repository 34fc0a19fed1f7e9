//! Repository for the `connected_servers` table.
//!
//! The `is_online` flag and its companion health columns are only ever
//! written through [`mark_online`](ConnectedServerRepo::mark_online) and
//! [`mark_offline`](ConnectedServerRepo::mark_offline), which the peer
//! client calls after each outbound request.

use sqlx::PgPool;

use cantata_core::types::DbId;

use crate::models::connected_server::{ConnectedServer, CreateConnectedServer, RemoteCounts};

/// Column list for `connected_servers` queries.
const COLUMNS: &str = "\
    id, user_id, name, base_url, token, is_online, \
    last_checked_at, last_online_at, \
    album_count, track_count, artist_count, \
    last_error, last_error_at, created_at, updated_at";

/// Provides CRUD operations for connected servers.
pub struct ConnectedServerRepo;

impl ConnectedServerRepo {
    /// Insert a new connected server. A freshly connected server is
    /// considered online (we just talked to it).
    pub async fn create(
        pool: &PgPool,
        input: &CreateConnectedServer,
    ) -> Result<ConnectedServer, sqlx::Error> {
        let query = format!(
            "INSERT INTO connected_servers (user_id, name, base_url, token, is_online, \
                                            last_checked_at, last_online_at) \
             VALUES ($1, $2, $3, $4, TRUE, NOW(), NOW()) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ConnectedServer>(&query)
            .bind(input.user_id)
            .bind(&input.name)
            .bind(&input.base_url)
            .bind(&input.token)
            .fetch_one(pool)
            .await
    }

    /// Find a server by id.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ConnectedServer>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM connected_servers WHERE id = $1");
        sqlx::query_as::<_, ConnectedServer>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user's server by its normalized base URL.
    pub async fn find_by_url(
        pool: &PgPool,
        user_id: DbId,
        base_url: &str,
    ) -> Result<Option<ConnectedServer>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM connected_servers WHERE user_id = $1 AND base_url = $2"
        );
        sqlx::query_as::<_, ConnectedServer>(&query)
            .bind(user_id)
            .bind(base_url)
            .fetch_optional(pool)
            .await
    }

    /// List a user's connected servers, newest first.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<ConnectedServer>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM connected_servers \
             WHERE user_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, ConnectedServer>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Record a successful contact: online, counts refreshed, error cleared.
    pub async fn mark_online(
        pool: &PgPool,
        id: DbId,
        counts: RemoteCounts,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE connected_servers \
             SET is_online = TRUE, last_checked_at = NOW(), last_online_at = NOW(), \
                 album_count = COALESCE($2, album_count), \
                 track_count = COALESCE($3, track_count), \
                 artist_count = COALESCE($4, artist_count), \
                 last_error = NULL, last_error_at = NULL, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(counts.albums)
        .bind(counts.tracks)
        .bind(counts.artists)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Record a failed contact: offline with the classified error text.
    pub async fn mark_offline(pool: &PgPool, id: DbId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE connected_servers \
             SET is_online = FALSE, last_checked_at = NOW(), \
                 last_error = $2, last_error_at = NOW(), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Delete a server row, scoped to its owner. Returns `true` if removed.
    pub async fn delete(pool: &PgPool, id: DbId, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM connected_servers WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
