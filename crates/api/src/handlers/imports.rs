//! Handlers for album import jobs (local users).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use cantata_core::error::CoreError;
use cantata_core::types::DbId;
use cantata_db::repositories::ConnectedServerRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct StartImportRequest {
    pub server_id: DbId,
    #[validate(length(min = 1, max = 256))]
    pub remote_album_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ListImportsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// ---------------------------------------------------------------------------
// POST /imports
// ---------------------------------------------------------------------------

/// Start importing an album from a connected server.
///
/// 202: the job may still be `pending` if every download slot is busy.
pub async fn start_import(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<StartImportRequest>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let server = ConnectedServerRepo::find_by_id(&state.pool, input.server_id)
        .await?
        .filter(|server| server.user_id == user.user_id)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ConnectedServer",
            id: input.server_id,
        }))?;

    let job = state
        .importer
        .start_import(user.user_id, &server, &input.remote_album_id)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: job })))
}

// ---------------------------------------------------------------------------
// GET /imports, GET /imports/{id}
// ---------------------------------------------------------------------------

/// List the caller's import jobs, newest first.
pub async fn list_imports(
    user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ListImportsQuery>,
) -> AppResult<impl IntoResponse> {
    let jobs = state
        .importer
        .list_jobs(user.user_id, params.limit, params.offset)
        .await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// One import job.
pub async fn get_import(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = state.importer.find_job(user.user_id, id).await?;
    Ok(Json(DataResponse { data: job }))
}

// ---------------------------------------------------------------------------
// POST /imports/{id}/cancel
// ---------------------------------------------------------------------------

/// Cancel a pending or downloading import job.
pub async fn cancel_import(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = state.importer.cancel_import(user.user_id, id).await?;
    Ok(Json(DataResponse { data: job }))
}
