//! Handlers for invitation management (local users).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use cantata_core::types::DbId;
use cantata_federation::IssueInvitation;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvitationRequest {
    #[validate(length(max = 128))]
    pub name: Option<String>,
    #[validate(range(min = 1, max = 365))]
    pub ttl_days: Option<i64>,
    #[validate(range(min = 1, max = 1000))]
    pub max_uses: Option<i32>,
}

// ---------------------------------------------------------------------------
// POST /invitations
// ---------------------------------------------------------------------------

/// Issue a new invitation code. The full code is returned once, here.
pub async fn create_invitation(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateInvitationRequest>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let mut params = IssueInvitation::new(user.user_id);
    params.name = input.name;
    if let Some(ttl_days) = input.ttl_days {
        params.ttl_days = ttl_days;
    }
    if let Some(max_uses) = input.max_uses {
        params.max_uses = max_uses;
    }

    let invitation = state.tokens.issue_invitation(params).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: invitation })))
}

// ---------------------------------------------------------------------------
// GET /invitations
// ---------------------------------------------------------------------------

/// List the caller's invitations, newest first.
pub async fn list_invitations(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let invitations = state.tokens.list_invitations(user.user_id).await?;
    Ok(Json(DataResponse { data: invitations }))
}

// ---------------------------------------------------------------------------
// DELETE /invitations/{id}
// ---------------------------------------------------------------------------

/// Delete one of the caller's invitations.
pub async fn delete_invitation(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    state.tokens.delete_invitation(id, user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// POST /invitations/cleanup
// ---------------------------------------------------------------------------

/// Sweep expired invitations. Returns how many were removed.
pub async fn cleanup_invitations(
    _user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let removed = state.tokens.cleanup_expired_invitations().await?;
    Ok(Json(DataResponse {
        data: serde_json::json!({ "removed": removed }),
    }))
}
