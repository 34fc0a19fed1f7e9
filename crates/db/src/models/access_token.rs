//! Access token entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use cantata_core::permissions::Permissions;
use cantata_core::types::{DbId, Timestamp};

/// Mutual-federation handshake states for an access token.
pub mod mutual_status {
    pub const NONE: &str = "none";
    pub const PENDING: &str = "pending";
    pub const APPROVED: &str = "approved";
    pub const REJECTED: &str = "rejected";
}

/// A row from the `access_tokens` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AccessToken {
    pub id: DbId,
    pub token: String,
    pub user_id: DbId,
    pub server_name: String,
    pub server_url: Option<String>,
    pub can_browse: bool,
    pub can_stream: bool,
    pub can_download: bool,
    pub is_active: bool,
    pub expires_at: Option<Timestamp>,
    pub last_used_at: Option<Timestamp>,
    pub last_used_from: Option<String>,
    pub mutual_status: String,
    pub mutual_invitation_token: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl AccessToken {
    /// The permission grants carried by this token.
    pub fn permissions(&self) -> Permissions {
        Permissions {
            can_browse: self.can_browse,
            can_stream: self.can_stream,
            can_download: self.can_download,
        }
    }

    /// Whether the token is currently usable.
    pub fn is_valid(&self, now: Timestamp) -> bool {
        self.is_active && self.expires_at.is_none_or(|exp| now < exp)
    }
}

/// DTO for minting a new access token (on invitation redemption).
#[derive(Debug, Clone)]
pub struct CreateAccessToken {
    pub token: String,
    pub user_id: DbId,
    pub server_name: String,
    pub server_url: Option<String>,
    pub permissions: Permissions,
    pub expires_at: Option<Timestamp>,
    pub mutual_invitation_token: Option<String>,
}

/// API request DTO for changing a token's permission grants.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePermissions {
    pub can_browse: Option<bool>,
    pub can_stream: Option<bool>,
    pub can_download: Option<bool>,
}
