//! Invitation token entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use cantata_core::types::{DbId, Timestamp};

/// A row from the `invitation_tokens` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InvitationToken {
    pub id: DbId,
    pub token: String,
    pub name: Option<String>,
    pub created_by: DbId,
    pub expires_at: Timestamp,
    pub max_uses: i32,
    pub current_uses: i32,
    pub is_used: bool,
    pub used_at: Option<Timestamp>,
    pub used_by_server: Option<String>,
    pub used_from_ip: Option<String>,
    pub created_at: Timestamp,
}

impl InvitationToken {
    /// Whether the invitation can still be redeemed right now.
    ///
    /// Informational only — the authoritative check happens inside the
    /// atomic consume statement.
    pub fn is_redeemable(&self, now: Timestamp) -> bool {
        now < self.expires_at && self.current_uses < self.max_uses
    }
}

/// DTO for inserting a new invitation row.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateInvitation {
    pub token: String,
    pub name: Option<String>,
    pub created_by: DbId,
    pub expires_at: Timestamp,
    pub max_uses: i32,
}

/// Usage metadata recorded by a successful redemption.
#[derive(Debug, Clone)]
pub struct RedemptionMeta<'a> {
    pub server_name: &'a str,
    pub source_ip: Option<&'a str>,
}
