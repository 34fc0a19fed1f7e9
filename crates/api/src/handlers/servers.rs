//! Handlers for outbound connected-server management (local users).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use cantata_core::error::CoreError;
use cantata_core::types::DbId;
use cantata_db::models::connected_server::ConnectedServer;
use cantata_db::repositories::ConnectedServerRepo;
use cantata_federation::IssueInvitation;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct ConnectServerRequest {
    #[validate(length(min = 1, max = 2048))]
    pub url: String,
    #[validate(length(min = 1, max = 64))]
    pub invitation_code: String,
    /// Ask the peer for a reverse connection; a local invitation is
    /// minted and sent along for it to redeem.
    #[serde(default)]
    pub request_mutual: bool,
}

/// Load a server row and verify the caller owns it.
async fn ensure_owned(state: &AppState, user_id: DbId, id: DbId) -> AppResult<ConnectedServer> {
    ConnectedServerRepo::find_by_id(&state.pool, id)
        .await?
        .filter(|server| server.user_id == user_id)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ConnectedServer",
            id,
        }))
}

// ---------------------------------------------------------------------------
// POST /servers
// ---------------------------------------------------------------------------

/// Connect to a peer server by redeeming an invitation code there.
pub async fn connect_server(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<ConnectServerRequest>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let mutual_code = if input.request_mutual {
        let invitation = state
            .tokens
            .issue_invitation(IssueInvitation::new(user.user_id))
            .await?;
        Some(invitation.token)
    } else {
        None
    };

    let outcome = state
        .connector
        .connect_to_server(
            user.user_id,
            &input.url,
            &input.invitation_code,
            mutual_code.as_deref(),
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: outcome.server,
        }),
    ))
}

// ---------------------------------------------------------------------------
// GET /servers
// ---------------------------------------------------------------------------

/// List the caller's connected servers.
pub async fn list_servers(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let servers = ConnectedServerRepo::list_by_user(&state.pool, user.user_id).await?;
    Ok(Json(DataResponse { data: servers }))
}

// ---------------------------------------------------------------------------
// POST /servers/{id}/sync
// ---------------------------------------------------------------------------

/// Probe the peer and refresh its online flag and cached counts.
pub async fn sync_server(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let server = ensure_owned(&state, user.user_id, id).await?;
    let refreshed = state.connector.sync_server(&server).await?;
    Ok(Json(DataResponse { data: refreshed }))
}

// ---------------------------------------------------------------------------
// DELETE /servers/{id}
// ---------------------------------------------------------------------------

/// Disconnect: best-effort notify the peer, then delete the row.
pub async fn disconnect_server(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let server = ensure_owned(&state, user.user_id, id).await?;
    state.connector.disconnect(&server).await?;
    Ok(StatusCode::NO_CONTENT)
}
