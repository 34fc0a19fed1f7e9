//! The import orchestrator service.
//!
//! Owns the scheduler state and the download tasks. Jobs are admitted up
//! to a process-wide bound; everything else waits in `pending` and is
//! picked up when a running job reaches a terminal state. The pickup is
//! event-triggered by job completion, never a timer.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;

use cantata_core::import::{ImportStatus, CANCELLED_BY_USER_REASON};
use cantata_core::types::DbId;
use cantata_db::models::connected_server::ConnectedServer;
use cantata_db::models::import_job::{CreateImportJob, ImportJob};
use cantata_db::repositories::{ConnectedServerRepo, ImportJobRepo, LibraryRepo};
use cantata_events::{ImportProgressEvent, ProgressBus};
use cantata_peer::{health, PeerClient};

use crate::download::{self, DownloadOutcome};
use crate::error::ImportError;
use crate::scheduler::SchedulerState;

/// Default bound on simultaneously downloading jobs.
pub const DEFAULT_MAX_CONCURRENT: usize = 2;

/// Importer configuration.
#[derive(Debug, Clone)]
pub struct ImporterConfig {
    /// Root directory all imported files must resolve under.
    pub library_root: PathBuf,
    /// Bound on simultaneously downloading jobs.
    pub max_concurrent: usize,
}

impl ImporterConfig {
    pub fn new(library_root: impl Into<PathBuf>) -> Self {
        Self {
            library_root: library_root.into(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

/// Album import orchestrator. Shared as `Arc<ImportService>`; download
/// tasks hold their own clone of the handle.
pub struct ImportService {
    pool: PgPool,
    bus: Arc<ProgressBus>,
    pub(crate) scheduler: SchedulerState,
    pub(crate) library_root: PathBuf,
}

impl ImportService {
    pub fn new(pool: PgPool, bus: Arc<ProgressBus>, config: ImporterConfig) -> Arc<Self> {
        Arc::new(Self {
            pool,
            bus,
            scheduler: SchedulerState::new(config.max_concurrent),
            library_root: config.library_root,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Startup crash sweep: fail every job a previous process instance
    /// left `downloading`. Must run before any new job is dispatched.
    pub async fn recover_orphaned_jobs(&self) -> Result<u64, ImportError> {
        let recovered = ImportJobRepo::recover_orphaned(&self.pool).await?;
        if recovered > 0 {
            tracing::warn!(recovered, "Failed orphaned import jobs from a previous run");
        }
        Ok(recovered)
    }

    // -----------------------------------------------------------------------
    // User-facing operations
    // -----------------------------------------------------------------------

    /// Start importing an album from a connected server.
    ///
    /// Fetches the remote metadata first (no lock held), rejects
    /// duplicates already in the local library and duplicate in-flight
    /// jobs, then inserts the job in `pending` and tries to dispatch it.
    pub async fn start_import(
        self: &Arc<Self>,
        user_id: DbId,
        server: &ConnectedServer,
        remote_album_id: &str,
    ) -> Result<ImportJob, ImportError> {
        let client = PeerClient::new(&server.base_url, &server.token)?;
        let detail = match client.album(remote_album_id).await {
            Ok(detail) => detail,
            Err(err) => {
                health::record_failure(&self.pool, server.id, &err).await?;
                return Err(err.into());
            }
        };
        health::record_success(&self.pool, server.id, None).await?;

        if LibraryRepo::find_album_by_names(&self.pool, &detail.album.name, &detail.album.artist)
            .await?
            .is_some()
        {
            return Err(ImportError::conflict(format!(
                "'{}' by {} is already in the library",
                detail.album.name, detail.album.artist
            )));
        }

        if let Some(existing) =
            ImportJobRepo::find_active_for_album(&self.pool, user_id, server.id, remote_album_id)
                .await?
        {
            return Err(ImportError::conflict(format!(
                "Import of this album is already {}",
                existing.status
            )));
        }

        let total_size = detail
            .tracks
            .iter()
            .filter_map(|t| t.file_size)
            .sum::<i64>();
        let job = ImportJobRepo::create(
            &self.pool,
            &CreateImportJob {
                user_id,
                server_id: server.id,
                remote_album_id: remote_album_id.to_string(),
                album_name: detail.album.name.clone(),
                artist_name: detail.album.artist.clone(),
                total_tracks: detail.tracks.len() as i32,
                total_size,
            },
        )
        .await?;

        tracing::info!(
            job_id = job.id,
            user_id,
            server_id = server.id,
            album = %job.album_name,
            "Import job created"
        );
        self.publish_snapshot(&job, ImportStatus::Pending, None);
        self.dispatch_pending().await;
        Ok(job)
    }

    /// Cancel an import job.
    ///
    /// Pending jobs flip straight to `cancelled`. Downloading jobs are
    /// flagged; the download loop observes the flag at the next track
    /// boundary and stops cleanly, leaving partial files in place.
    pub async fn cancel_import(&self, user_id: DbId, job_id: DbId) -> Result<ImportJob, ImportError> {
        let job = self.find_job(user_id, job_id).await?;
        match job.import_status()? {
            ImportStatus::Pending => {
                if let Some(cancelled) = ImportJobRepo::cancel_pending(&self.pool, job_id).await? {
                    tracing::info!(job_id, "Pending import cancelled");
                    self.publish_snapshot(&cancelled, ImportStatus::Cancelled, None);
                    return Ok(cancelled);
                }
                // Raced into downloading between the read and the flip.
                self.scheduler.request_cancel(job_id);
                self.find_job(user_id, job_id).await
            }
            ImportStatus::Downloading => {
                self.scheduler.request_cancel(job_id);
                tracing::info!(job_id, "Cancellation requested for running import");
                Ok(job)
            }
            status => Err(ImportError::conflict(format!(
                "Import is already {status} and cannot be cancelled"
            ))),
        }
    }

    /// Fetch a job, enforcing ownership.
    pub async fn find_job(&self, user_id: DbId, job_id: DbId) -> Result<ImportJob, ImportError> {
        ImportJobRepo::find_by_id(&self.pool, job_id)
            .await?
            .filter(|job| job.user_id == user_id)
            .ok_or_else(|| ImportError::not_found("ImportJob", job_id))
    }

    /// List a user's jobs, newest first.
    pub async fn list_jobs(
        &self,
        user_id: DbId,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<ImportJob>, ImportError> {
        Ok(ImportJobRepo::list_by_user(&self.pool, user_id, limit, offset).await?)
    }

    // -----------------------------------------------------------------------
    // Scheduling
    // -----------------------------------------------------------------------

    /// Claim slots and dispatch pending jobs until either runs out.
    ///
    /// Called after job creation and after every terminal job. The
    /// `pending -> downloading` flip is conditional, so two racing
    /// dispatchers cannot start the same job twice.
    pub async fn dispatch_pending(self: &Arc<Self>) {
        loop {
            if !self.scheduler.try_claim_slot() {
                return;
            }
            let next = match ImportJobRepo::next_pending(&self.pool).await {
                Ok(next) => next,
                Err(err) => {
                    tracing::error!(error = %err, "Failed to fetch next pending import");
                    self.scheduler.release_slot();
                    return;
                }
            };
            let Some(job) = next else {
                self.scheduler.release_slot();
                return;
            };

            match ImportJobRepo::mark_downloading(&self.pool, job.id, job.total_tracks, job.total_size)
                .await
            {
                Ok(Some(job)) => {
                    let service = Arc::clone(self);
                    tokio::spawn(async move { service.run_job(job).await });
                }
                // Someone else claimed or cancelled it; try the next one.
                Ok(None) => self.scheduler.release_slot(),
                Err(err) => {
                    tracing::error!(job_id = job.id, error = %err, "Failed to start import job");
                    self.scheduler.release_slot();
                    return;
                }
            }
        }
    }

    /// Run one download to a terminal state, then free the slot and pull
    /// the next pending job.
    ///
    /// Returns a boxed future to break the `run_job` -> `dispatch_pending`
    /// -> `run_job` auto-trait cycle the compiler cannot resolve for plain
    /// async fns.
    fn run_job(
        self: Arc<Self>,
        job: ImportJob,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> {
        Box::pin(async move {
        tracing::info!(job_id = job.id, album = %job.album_name, "Import download started");
        self.publish_snapshot(&job, ImportStatus::Downloading, None);

        let result = download::run(&self, &job).await;
        match result {
            Ok(DownloadOutcome::Completed) => {
                match ImportJobRepo::complete(&self.pool, job.id).await {
                    Ok(Some(done)) => {
                        tracing::info!(job_id = job.id, "Import completed");
                        self.publish_snapshot(&done, ImportStatus::Completed, None);
                    }
                    Ok(None) => {
                        tracing::error!(job_id = job.id, "Completed job was not in downloading state")
                    }
                    Err(err) => tracing::error!(job_id = job.id, error = %err, "Failed to mark import completed"),
                }
            }
            Ok(DownloadOutcome::Cancelled) => {
                self.fail_job(job.id, CANCELLED_BY_USER_REASON).await;
            }
            Err(err) => {
                tracing::warn!(job_id = job.id, error = %err, "Import failed");
                self.fail_job(job.id, &err.to_string()).await;
            }
        }

        self.scheduler.clear_cancelled(job.id);
        self.scheduler.release_slot();
        self.dispatch_pending().await;
        })
    }

    async fn fail_job(&self, job_id: DbId, reason: &str) {
        match ImportJobRepo::fail(&self.pool, job_id, reason).await {
            Ok(Some(failed)) => {
                self.publish_snapshot(&failed, ImportStatus::Failed, Some(reason.to_string()));
            }
            Ok(None) => {
                tracing::error!(job_id, "Failed job was not in downloading state");
            }
            Err(err) => {
                tracing::error!(job_id, error = %err, "Failed to persist import failure");
            }
        }
    }

    /// Re-check the source server row mid-job; used by the download loop.
    pub(crate) async fn source_server(
        &self,
        job: &ImportJob,
    ) -> Result<ConnectedServer, ImportError> {
        let server_id = job
            .server_id
            .ok_or_else(|| ImportError::conflict("Source server is no longer connected"))?;
        ConnectedServerRepo::find_by_id(&self.pool, server_id)
            .await?
            .ok_or_else(|| ImportError::conflict("Source server is no longer connected"))
    }

    /// Publish a progress event built from a job row.
    pub(crate) fn publish_snapshot(
        &self,
        job: &ImportJob,
        status: ImportStatus,
        error: Option<String>,
    ) {
        self.bus.publish(ImportProgressEvent {
            job_id: job.id,
            user_id: job.user_id,
            status,
            progress: job.progress,
            downloaded_tracks: job.downloaded_tracks,
            total_tracks: job.total_tracks,
            downloaded_size: job.downloaded_size,
            total_size: job.total_size,
            error: error.or_else(|| job.error_message.clone()),
            timestamp: Utc::now(),
        });
    }

    /// Publish a mid-download progress event with live counters.
    pub(crate) fn publish_progress(
        &self,
        job: &ImportJob,
        progress: i32,
        downloaded_tracks: i32,
        downloaded_size: i64,
        total_tracks: i32,
        total_size: i64,
    ) {
        self.bus.publish(ImportProgressEvent {
            job_id: job.id,
            user_id: job.user_id,
            status: ImportStatus::Downloading,
            progress,
            downloaded_tracks,
            total_tracks,
            downloaded_size,
            total_size,
            error: None,
            timestamp: Utc::now(),
        });
    }
}
