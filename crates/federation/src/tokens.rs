//! Invitation and access-token lifecycle service.
//!
//! Issues invitation codes, redeems them into access tokens, validates
//! tokens on the inbound hot path, and drives the mutual-federation
//! handshake state. The race-sensitive step — consuming a use of an
//! invitation — is delegated to `InvitationRepo::consume`, which is a
//! single atomic conditional update; this service never reads-then-writes
//! an invitation.

use chrono::{Duration, Utc};
use sqlx::PgPool;

use cantata_core::error::CoreError;
use cantata_core::permissions::Permissions;
use cantata_core::token::{
    canonicalize_invitation_code, generate_access_token, generate_invitation_code, token_hint,
    validate_invitation_params,
};
use cantata_core::types::DbId;
use cantata_db::models::access_token::{mutual_status, AccessToken, CreateAccessToken};
use cantata_db::models::invitation::{CreateInvitation, InvitationToken, RedemptionMeta};
use cantata_db::repositories::{AccessTokenRepo, InvitationRepo};

use crate::error::FederationError;

/// Default invitation lifetime in days.
pub const DEFAULT_TTL_DAYS: i64 = 7;

/// Default number of redemptions per invitation.
pub const DEFAULT_MAX_USES: i32 = 1;

/// Parameters for [`TokenService::issue_invitation`].
#[derive(Debug, Clone)]
pub struct IssueInvitation {
    pub owner_id: DbId,
    pub name: Option<String>,
    pub ttl_days: i64,
    pub max_uses: i32,
}

impl IssueInvitation {
    /// Invitation with the default TTL and a single use.
    pub fn new(owner_id: DbId) -> Self {
        Self {
            owner_id,
            name: None,
            ttl_days: DEFAULT_TTL_DAYS,
            max_uses: DEFAULT_MAX_USES,
        }
    }
}

/// Result of a successful invitation redemption.
#[derive(Debug, Clone)]
pub struct RedeemOutcome {
    /// The consumed invitation row, post-increment.
    pub invitation: InvitationToken,
    /// The freshly minted access token for the redeeming peer.
    pub access_token: AccessToken,
}

/// Invitation and access-token operations, backed by the database pool.
pub struct TokenService {
    pool: PgPool,
}

impl TokenService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // -----------------------------------------------------------------------
    // Invitations
    // -----------------------------------------------------------------------

    /// Issue a new invitation code for the owner.
    pub async fn issue_invitation(
        &self,
        input: IssueInvitation,
    ) -> Result<InvitationToken, FederationError> {
        validate_invitation_params(input.name.as_deref(), input.ttl_days, input.max_uses)?;

        let create = CreateInvitation {
            token: generate_invitation_code(),
            name: input.name,
            created_by: input.owner_id,
            expires_at: Utc::now() + Duration::days(input.ttl_days),
            max_uses: input.max_uses,
        };
        let invitation = InvitationRepo::create(&self.pool, &create).await?;

        tracing::info!(
            invitation_id = invitation.id,
            owner_id = invitation.created_by,
            max_uses = invitation.max_uses,
            "Invitation issued"
        );
        Ok(invitation)
    }

    /// List all invitations created by a user.
    pub async fn list_invitations(
        &self,
        owner_id: DbId,
    ) -> Result<Vec<InvitationToken>, FederationError> {
        Ok(InvitationRepo::list_by_owner(&self.pool, owner_id).await?)
    }

    /// Delete an invitation, scoped to its owner.
    pub async fn delete_invitation(
        &self,
        id: DbId,
        owner_id: DbId,
    ) -> Result<(), FederationError> {
        if InvitationRepo::delete(&self.pool, id, owner_id).await? {
            Ok(())
        } else {
            Err(FederationError::not_found("InvitationToken", id))
        }
    }

    /// Redeem an invitation code into a new access token.
    ///
    /// Returns `Ok(None)` when the code is unknown, expired, or exhausted;
    /// those outcomes are indistinguishable to the caller so nothing is
    /// leaked about codes that exist. Errors are reserved for malformed
    /// input and infrastructure failures.
    pub async fn redeem_invitation(
        &self,
        code: &str,
        peer_name: &str,
        peer_url: Option<&str>,
        source_ip: Option<&str>,
        mutual_code: Option<&str>,
    ) -> Result<Option<RedeemOutcome>, FederationError> {
        let peer_name = peer_name.trim();
        if peer_name.is_empty() {
            return Err(CoreError::Validation("Server name must not be empty".into()).into());
        }

        let code = canonicalize_invitation_code(code);
        let meta = RedemptionMeta {
            server_name: peer_name,
            source_ip,
        };
        let Some(invitation) = InvitationRepo::consume(&self.pool, &code, &meta).await? else {
            tracing::info!(peer = %peer_name, "Invitation redemption refused");
            return Ok(None);
        };

        let create = CreateAccessToken {
            token: generate_access_token(),
            user_id: invitation.created_by,
            server_name: peer_name.to_string(),
            server_url: peer_url.map(str::to_string),
            permissions: Permissions::default_for_new_peer(),
            expires_at: None,
            mutual_invitation_token: mutual_code.map(canonicalize_invitation_code),
        };
        let access_token = AccessTokenRepo::create(&self.pool, &create).await?;

        tracing::info!(
            invitation_id = invitation.id,
            token_id = access_token.id,
            peer = %peer_name,
            mutual = access_token.mutual_status == mutual_status::PENDING,
            "Invitation redeemed"
        );
        Ok(Some(RedeemOutcome {
            invitation,
            access_token,
        }))
    }

    /// Bulk-delete expired invitations. Returns the number removed.
    pub async fn cleanup_expired_invitations(&self) -> Result<u64, FederationError> {
        let removed = InvitationRepo::delete_expired(&self.pool).await?;
        if removed > 0 {
            tracing::info!(removed, "Expired invitations swept");
        }
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Access tokens
    // -----------------------------------------------------------------------

    /// Validate a bearer token presented on an inbound federation request.
    ///
    /// Returns the token row when it is active and unexpired, `None`
    /// otherwise. On success the last-used metadata is updated on a
    /// detached task: this sits on every inbound request and must never
    /// fail the request over bookkeeping.
    pub async fn validate_access(
        &self,
        token_value: &str,
        origin: Option<&str>,
    ) -> Result<Option<AccessToken>, FederationError> {
        let Some(token) = AccessTokenRepo::find_by_token(&self.pool, token_value).await? else {
            return Ok(None);
        };
        if !token.is_valid(Utc::now()) {
            tracing::debug!(token_id = token.id, "Inactive or expired access token presented");
            return Ok(None);
        }

        let pool = self.pool.clone();
        let token_id = token.id;
        let origin = origin.map(str::to_string);
        tokio::spawn(async move {
            if let Err(err) =
                AccessTokenRepo::touch_last_used(&pool, token_id, origin.as_deref()).await
            {
                tracing::warn!(token_id, error = %err, "Failed to record token last-use");
            }
        });

        Ok(Some(token))
    }

    /// Find an access token by id, for ownership checks in the api layer.
    pub async fn find_token(&self, id: DbId) -> Result<AccessToken, FederationError> {
        AccessTokenRepo::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| FederationError::not_found("AccessToken", id))
    }

    /// List all access tokens a user has issued.
    pub async fn list_tokens(&self, user_id: DbId) -> Result<Vec<AccessToken>, FederationError> {
        Ok(AccessTokenRepo::list_by_user(&self.pool, user_id).await?)
    }

    /// Replace a token's permission grants.
    pub async fn update_permissions(
        &self,
        id: DbId,
        permissions: Permissions,
    ) -> Result<AccessToken, FederationError> {
        let updated = AccessTokenRepo::update_permissions(
            &self.pool,
            id,
            permissions.can_browse,
            permissions.can_stream,
            permissions.can_download,
        )
        .await?
        .ok_or_else(|| FederationError::not_found("AccessToken", id))?;

        tracing::info!(
            token_id = id,
            can_browse = permissions.can_browse,
            can_stream = permissions.can_stream,
            can_download = permissions.can_download,
            "Access token permissions updated"
        );
        Ok(updated)
    }

    /// Soft-revoke a token. Conflict when it is already revoked.
    pub async fn revoke_token(&self, id: DbId) -> Result<AccessToken, FederationError> {
        match AccessTokenRepo::revoke(&self.pool, id).await? {
            Some(token) => {
                tracing::info!(token_id = id, hint = %token_hint(&token.token), "Access token revoked");
                Ok(token)
            }
            None => {
                self.find_token(id).await?;
                Err(CoreError::Conflict("Access token is already revoked".into()).into())
            }
        }
    }

    /// Reactivate a revoked token. Conflict when it is already active;
    /// hard-deleted tokens are gone and surface as not-found.
    pub async fn reactivate_token(&self, id: DbId) -> Result<AccessToken, FederationError> {
        match AccessTokenRepo::reactivate(&self.pool, id).await? {
            Some(token) => {
                tracing::info!(token_id = id, "Access token reactivated");
                Ok(token)
            }
            None => {
                self.find_token(id).await?;
                Err(CoreError::Conflict("Access token is already active".into()).into())
            }
        }
    }

    /// Hard-delete a token. Irreversible.
    pub async fn delete_token(&self, id: DbId) -> Result<(), FederationError> {
        if AccessTokenRepo::delete(&self.pool, id).await? {
            tracing::info!(token_id = id, "Access token deleted");
            Ok(())
        } else {
            Err(FederationError::not_found("AccessToken", id))
        }
    }

    // -----------------------------------------------------------------------
    // Mutual federation handshake
    // -----------------------------------------------------------------------

    /// Approve a pending mutual-federation request.
    ///
    /// Flips `pending -> approved` with a conditional update and returns
    /// the row, whose stored `mutual_invitation_token` the caller then
    /// redeems against the peer to open the reverse connection.
    pub async fn approve_mutual_request(&self, id: DbId) -> Result<AccessToken, FederationError> {
        self.resolve_mutual(id, mutual_status::APPROVED).await
    }

    /// Reject a pending mutual-federation request.
    pub async fn reject_mutual_request(&self, id: DbId) -> Result<AccessToken, FederationError> {
        self.resolve_mutual(id, mutual_status::REJECTED).await
    }

    async fn resolve_mutual(
        &self,
        id: DbId,
        resolution: &'static str,
    ) -> Result<AccessToken, FederationError> {
        match AccessTokenRepo::resolve_mutual(&self.pool, id, resolution).await? {
            Some(token) => {
                tracing::info!(token_id = id, resolution, "Mutual federation request resolved");
                Ok(token)
            }
            None => {
                // Distinguish a missing row from a non-pending state.
                self.find_token(id).await?;
                Err(CoreError::Conflict(
                    "No pending mutual federation request for this token".into(),
                )
                .into())
            }
        }
    }
}
