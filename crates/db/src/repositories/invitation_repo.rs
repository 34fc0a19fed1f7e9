//! Repository for the `invitation_tokens` table.
//!
//! The redemption race is closed here: [`InvitationRepo::consume`] is a
//! single conditional `UPDATE ... RETURNING`, so N concurrent redemptions
//! of a `max_uses = 1` code can succeed at most once regardless of
//! interleaving.

use sqlx::PgPool;

use cantata_core::types::DbId;

use crate::models::invitation::{CreateInvitation, InvitationToken, RedemptionMeta};

/// Column list for `invitation_tokens` queries.
const COLUMNS: &str = "\
    id, token, name, created_by, expires_at, max_uses, current_uses, \
    is_used, used_at, used_by_server, used_from_ip, created_at";

/// Provides CRUD operations for invitation tokens.
pub struct InvitationRepo;

impl InvitationRepo {
    /// Insert a new invitation row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateInvitation,
    ) -> Result<InvitationToken, sqlx::Error> {
        let query = format!(
            "INSERT INTO invitation_tokens (token, name, created_by, expires_at, max_uses) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, InvitationToken>(&query)
            .bind(&input.token)
            .bind(&input.name)
            .bind(input.created_by)
            .bind(input.expires_at)
            .bind(input.max_uses)
            .fetch_one(pool)
            .await
    }

    /// Atomically consume one use of an invitation, if it is still valid.
    ///
    /// Increments `current_uses` and records usage metadata only while the
    /// row still satisfies `expires_at > NOW() AND current_uses < max_uses`.
    /// Returns `None` when the code is unknown, expired, or exhausted —
    /// the three cases are deliberately indistinguishable to the caller.
    pub async fn consume(
        pool: &PgPool,
        token: &str,
        meta: &RedemptionMeta<'_>,
    ) -> Result<Option<InvitationToken>, sqlx::Error> {
        let query = format!(
            "UPDATE invitation_tokens \
             SET current_uses = current_uses + 1, \
                 is_used = (current_uses + 1 >= max_uses), \
                 used_at = NOW(), \
                 used_by_server = $2, \
                 used_from_ip = $3 \
             WHERE token = $1 \
               AND expires_at > NOW() \
               AND current_uses < max_uses \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, InvitationToken>(&query)
            .bind(token)
            .bind(meta.server_name)
            .bind(meta.source_ip)
            .fetch_optional(pool)
            .await
    }

    /// Find an invitation by its ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<InvitationToken>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM invitation_tokens WHERE id = $1");
        sqlx::query_as::<_, InvitationToken>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all invitations created by a user, newest first.
    pub async fn list_by_owner(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<InvitationToken>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM invitation_tokens \
             WHERE created_by = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, InvitationToken>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Delete an invitation by id, scoped to its owner.
    ///
    /// Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId, owner: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM invitation_tokens WHERE id = $1 AND created_by = $2",
        )
        .bind(id)
        .bind(owner)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Bulk-delete all expired invitations. Returns the number removed.
    pub async fn delete_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM invitation_tokens WHERE expires_at <= NOW()")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
