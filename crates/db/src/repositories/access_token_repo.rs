//! Repository for the `access_tokens` table.

use sqlx::PgPool;

use cantata_core::types::DbId;

use crate::models::access_token::{mutual_status, AccessToken, CreateAccessToken};

/// Column list for `access_tokens` queries.
const COLUMNS: &str = "\
    id, token, user_id, server_name, server_url, \
    can_browse, can_stream, can_download, is_active, \
    expires_at, last_used_at, last_used_from, \
    mutual_status, mutual_invitation_token, created_at, updated_at";

/// Provides CRUD operations for access tokens.
pub struct AccessTokenRepo;

impl AccessTokenRepo {
    /// Mint a new access token row.
    ///
    /// `mutual_status` starts as `pending` when the peer supplied a reverse
    /// invitation code, `none` otherwise.
    pub async fn create(
        pool: &PgPool,
        input: &CreateAccessToken,
    ) -> Result<AccessToken, sqlx::Error> {
        let mutual = if input.mutual_invitation_token.is_some() {
            mutual_status::PENDING
        } else {
            mutual_status::NONE
        };
        let query = format!(
            "INSERT INTO access_tokens \
                 (token, user_id, server_name, server_url, \
                  can_browse, can_stream, can_download, \
                  expires_at, mutual_status, mutual_invitation_token) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AccessToken>(&query)
            .bind(&input.token)
            .bind(input.user_id)
            .bind(&input.server_name)
            .bind(&input.server_url)
            .bind(input.permissions.can_browse)
            .bind(input.permissions.can_stream)
            .bind(input.permissions.can_download)
            .bind(input.expires_at)
            .bind(mutual)
            .bind(&input.mutual_invitation_token)
            .fetch_one(pool)
            .await
    }

    /// Find a token row by its secret value.
    pub async fn find_by_token(
        pool: &PgPool,
        token: &str,
    ) -> Result<Option<AccessToken>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM access_tokens WHERE token = $1");
        sqlx::query_as::<_, AccessToken>(&query)
            .bind(token)
            .fetch_optional(pool)
            .await
    }

    /// Find a token row by id.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<AccessToken>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM access_tokens WHERE id = $1");
        sqlx::query_as::<_, AccessToken>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all tokens issued by a user, newest first.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<AccessToken>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM access_tokens \
             WHERE user_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, AccessToken>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Record that the token was just used and from where.
    ///
    /// Callers on the request hot path treat failures here as log-and-
    /// continue; the update itself is trivial.
    pub async fn touch_last_used(
        pool: &PgPool,
        id: DbId,
        origin: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE access_tokens \
             SET last_used_at = NOW(), last_used_from = COALESCE($2, last_used_from) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(origin)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Replace the permission grants on a token.
    pub async fn update_permissions(
        pool: &PgPool,
        id: DbId,
        can_browse: bool,
        can_stream: bool,
        can_download: bool,
    ) -> Result<Option<AccessToken>, sqlx::Error> {
        let query = format!(
            "UPDATE access_tokens \
             SET can_browse = $2, can_stream = $3, can_download = $4, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AccessToken>(&query)
            .bind(id)
            .bind(can_browse)
            .bind(can_stream)
            .bind(can_download)
            .fetch_optional(pool)
            .await
    }

    /// Soft-revoke: flip `is_active` off. The row survives so the owner
    /// can reactivate later.
    pub async fn revoke(pool: &PgPool, id: DbId) -> Result<Option<AccessToken>, sqlx::Error> {
        let query = format!(
            "UPDATE access_tokens SET is_active = FALSE, updated_at = NOW() \
             WHERE id = $1 AND is_active = TRUE \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AccessToken>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Reactivate a previously revoked token.
    pub async fn reactivate(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<AccessToken>, sqlx::Error> {
        let query = format!(
            "UPDATE access_tokens SET is_active = TRUE, updated_at = NOW() \
             WHERE id = $1 AND is_active = FALSE \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AccessToken>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Hard delete. Unlike [`revoke`](Self::revoke) this is irreversible.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM access_tokens WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Transition `mutual_status` from `pending` to the given resolution.
    ///
    /// Conditional on the current state being `pending`; returns `None`
    /// when there was no pending request to resolve.
    pub async fn resolve_mutual(
        pool: &PgPool,
        id: DbId,
        resolution: &str,
    ) -> Result<Option<AccessToken>, sqlx::Error> {
        let query = format!(
            "UPDATE access_tokens \
             SET mutual_status = $2, updated_at = NOW() \
             WHERE id = $1 AND mutual_status = $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AccessToken>(&query)
            .bind(id)
            .bind(resolution)
            .bind(mutual_status::PENDING)
            .fetch_optional(pool)
            .await
    }
}
