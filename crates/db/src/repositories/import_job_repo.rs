//! Repository for the `import_jobs` table.
//!
//! Every status change is a conditional update guarded by the expected
//! current status, so no sequence of calls can move a job along an edge
//! the state machine does not allow.

use sqlx::PgPool;

use cantata_core::import::{ImportStatus, ORPHANED_JOB_REASON};
use cantata_core::types::DbId;

use crate::models::import_job::{CreateImportJob, ImportJob};

/// Column list for `import_jobs` queries.
const COLUMNS: &str = "\
    id, user_id, server_id, remote_album_id, album_name, artist_name, \
    status, progress, total_tracks, downloaded_tracks, total_size, \
    downloaded_size, error_message, started_at, completed_at, \
    created_at, updated_at";

/// Default page size for job listing.
const DEFAULT_LIMIT: i64 = 50;

/// Maximum page size for job listing.
const MAX_LIMIT: i64 = 200;

/// Provides CRUD operations for album import jobs.
pub struct ImportJobRepo;

impl ImportJobRepo {
    /// Insert a new job in `pending`.
    pub async fn create(
        pool: &PgPool,
        input: &CreateImportJob,
    ) -> Result<ImportJob, sqlx::Error> {
        let query = format!(
            "INSERT INTO import_jobs \
                 (user_id, server_id, remote_album_id, album_name, artist_name, \
                  status, total_tracks, total_size) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportJob>(&query)
            .bind(input.user_id)
            .bind(input.server_id)
            .bind(&input.remote_album_id)
            .bind(&input.album_name)
            .bind(&input.artist_name)
            .bind(ImportStatus::Pending.as_str())
            .bind(input.total_tracks)
            .bind(input.total_size)
            .fetch_one(pool)
            .await
    }

    /// Find a job by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ImportJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM import_jobs WHERE id = $1");
        sqlx::query_as::<_, ImportJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a non-terminal job for the same (user, server, remote album)
    /// triple. Backs the duplicate-in-flight guard in `start_import`.
    pub async fn find_active_for_album(
        pool: &PgPool,
        user_id: DbId,
        server_id: DbId,
        remote_album_id: &str,
    ) -> Result<Option<ImportJob>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM import_jobs \
             WHERE user_id = $1 AND server_id = $2 AND remote_album_id = $3 \
               AND status IN ($4, $5) \
             LIMIT 1"
        );
        sqlx::query_as::<_, ImportJob>(&query)
            .bind(user_id)
            .bind(server_id)
            .bind(remote_album_id)
            .bind(ImportStatus::Pending.as_str())
            .bind(ImportStatus::Downloading.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Fetch the oldest pending job, used by the scheduler when a download
    /// slot frees up.
    pub async fn next_pending(pool: &PgPool) -> Result<Option<ImportJob>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM import_jobs \
             WHERE status = $1 ORDER BY created_at ASC LIMIT 1"
        );
        sqlx::query_as::<_, ImportJob>(&query)
            .bind(ImportStatus::Pending.as_str())
            .fetch_optional(pool)
            .await
    }

    /// List a user's jobs, newest first.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: DbId,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<ImportJob>, sqlx::Error> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = offset.unwrap_or(0).max(0);
        let query = format!(
            "SELECT {COLUMNS} FROM import_jobs \
             WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, ImportJob>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// List a user's non-terminal jobs, oldest first. Used for the
    /// WebSocket snapshot on attach.
    pub async fn list_active_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<ImportJob>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM import_jobs \
             WHERE user_id = $1 AND status IN ($2, $3) \
             ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, ImportJob>(&query)
            .bind(user_id)
            .bind(ImportStatus::Pending.as_str())
            .bind(ImportStatus::Downloading.as_str())
            .fetch_all(pool)
            .await
    }

    /// Move a job from `pending` to `downloading`, recording totals and the
    /// start time. Returns `None` if the job was no longer pending (e.g.
    /// cancelled while queued).
    pub async fn mark_downloading(
        pool: &PgPool,
        id: DbId,
        total_tracks: i32,
        total_size: i64,
    ) -> Result<Option<ImportJob>, sqlx::Error> {
        let query = format!(
            "UPDATE import_jobs \
             SET status = $2, total_tracks = $3, total_size = $4, \
                 started_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status = $5 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportJob>(&query)
            .bind(id)
            .bind(ImportStatus::Downloading.as_str())
            .bind(total_tracks)
            .bind(total_size)
            .bind(ImportStatus::Pending.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Update the per-track progress counters.
    pub async fn update_progress(
        pool: &PgPool,
        id: DbId,
        downloaded_tracks: i32,
        downloaded_size: i64,
        progress: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE import_jobs \
             SET downloaded_tracks = $2, downloaded_size = $3, progress = $4, \
                 updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(downloaded_tracks)
        .bind(downloaded_size)
        .bind(progress)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark a downloading job completed.
    pub async fn complete(pool: &PgPool, id: DbId) -> Result<Option<ImportJob>, sqlx::Error> {
        let query = format!(
            "UPDATE import_jobs \
             SET status = $2, progress = 100, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status = $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportJob>(&query)
            .bind(id)
            .bind(ImportStatus::Completed.as_str())
            .bind(ImportStatus::Downloading.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Mark a downloading job failed with the first fatal error message.
    pub async fn fail(
        pool: &PgPool,
        id: DbId,
        error: &str,
    ) -> Result<Option<ImportJob>, sqlx::Error> {
        let query = format!(
            "UPDATE import_jobs \
             SET status = $2, error_message = $3, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status = $4 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportJob>(&query)
            .bind(id)
            .bind(ImportStatus::Failed.as_str())
            .bind(error)
            .bind(ImportStatus::Downloading.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Cancel a job that never started downloading.
    pub async fn cancel_pending(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ImportJob>, sqlx::Error> {
        let query = format!(
            "UPDATE import_jobs \
             SET status = $2, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status = $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportJob>(&query)
            .bind(id)
            .bind(ImportStatus::Cancelled.as_str())
            .bind(ImportStatus::Pending.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Crash-recovery sweep: any job still `downloading` at startup was
    /// owned by a process that died. Move them all to `failed` with a
    /// fixed reason and return how many were recovered.
    pub async fn recover_orphaned(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE import_jobs \
             SET status = $1, error_message = $2, completed_at = NOW(), updated_at = NOW() \
             WHERE status = $3",
        )
        .bind(ImportStatus::Failed.as_str())
        .bind(ORPHANED_JOB_REASON)
        .bind(ImportStatus::Downloading.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
