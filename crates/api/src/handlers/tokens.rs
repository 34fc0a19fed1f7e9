//! Handlers for access-token management (local users).
//!
//! Ownership is enforced here, not in the token service: every mutation
//! first loads the row and checks it belongs to the caller, answering
//! with 404 for other users' tokens so ids leak nothing.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use cantata_core::error::CoreError;
use cantata_core::permissions::Permissions;
use cantata_core::types::DbId;
use cantata_db::models::access_token::{AccessToken, UpdatePermissions};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Load a token and verify the caller owns it.
async fn ensure_owned(state: &AppState, user_id: DbId, id: DbId) -> AppResult<AccessToken> {
    let token = state.tokens.find_token(id).await?;
    if token.user_id != user_id {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "AccessToken",
            id,
        }));
    }
    Ok(token)
}

// ---------------------------------------------------------------------------
// GET /tokens
// ---------------------------------------------------------------------------

/// List the access tokens the caller has issued to peers.
pub async fn list_tokens(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let tokens = state.tokens.list_tokens(user.user_id).await?;
    Ok(Json(DataResponse { data: tokens }))
}

// ---------------------------------------------------------------------------
// PUT /tokens/{id}/permissions
// ---------------------------------------------------------------------------

/// Change a token's permission grants. Omitted fields keep their value.
pub async fn update_permissions(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdatePermissions>,
) -> AppResult<impl IntoResponse> {
    let current = ensure_owned(&state, user.user_id, id).await?;
    let merged = Permissions {
        can_browse: input.can_browse.unwrap_or(current.can_browse),
        can_stream: input.can_stream.unwrap_or(current.can_stream),
        can_download: input.can_download.unwrap_or(current.can_download),
    };
    let updated = state.tokens.update_permissions(id, merged).await?;
    Ok(Json(DataResponse { data: updated }))
}

// ---------------------------------------------------------------------------
// POST /tokens/{id}/revoke, POST /tokens/{id}/reactivate
// ---------------------------------------------------------------------------

/// Soft-revoke a token; the peer's calls start failing immediately.
pub async fn revoke_token(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    ensure_owned(&state, user.user_id, id).await?;
    let token = state.tokens.revoke_token(id).await?;
    Ok(Json(DataResponse { data: token }))
}

/// Reactivate a revoked token. Deleted tokens cannot come back.
pub async fn reactivate_token(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    ensure_owned(&state, user.user_id, id).await?;
    let token = state.tokens.reactivate_token(id).await?;
    Ok(Json(DataResponse { data: token }))
}

// ---------------------------------------------------------------------------
// DELETE /tokens/{id}
// ---------------------------------------------------------------------------

/// Hard-delete a token. Irreversible.
pub async fn delete_token(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    ensure_owned(&state, user.user_id, id).await?;
    state.tokens.delete_token(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// POST /tokens/{id}/mutual/approve, POST /tokens/{id}/mutual/reject
// ---------------------------------------------------------------------------

/// Approve a pending mutual-federation request, then connect back to the
/// peer with the invitation code it supplied.
pub async fn approve_mutual(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    ensure_owned(&state, user.user_id, id).await?;
    let approved = state.tokens.approve_mutual_request(id).await?;

    let (Some(url), Some(code)) = (
        approved.server_url.as_deref(),
        approved.mutual_invitation_token.as_deref(),
    ) else {
        return Err(AppError::Core(CoreError::Conflict(
            "The peer did not supply a URL and invitation for the reverse connection".into(),
        )));
    };

    let outcome = state
        .connector
        .connect_to_server(user.user_id, url, code, None)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: outcome.server,
        }),
    ))
}

/// Reject a pending mutual-federation request.
pub async fn reject_mutual(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    ensure_owned(&state, user.user_id, id).await?;
    let token = state.tokens.reject_mutual_request(id).await?;
    Ok(Json(DataResponse { data: token }))
}
