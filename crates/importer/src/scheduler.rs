//! In-memory scheduler state: the download-slot counter and the
//! cancellation set.
//!
//! Both live behind one mutex and are deliberately not persisted. A
//! restart loses them, and that is fine only because the startup crash
//! sweep independently fails every orphaned `downloading` row; the two
//! mechanisms are a pair and must stay a pair.

use std::collections::HashSet;
use std::sync::Mutex;

use cantata_core::types::DbId;

struct Inner {
    active: usize,
    cancelled: HashSet<DbId>,
}

/// Admission-control counter plus cancellation set, safe to share across
/// background tasks.
pub struct SchedulerState {
    max_concurrent: usize,
    inner: Mutex<Inner>,
}

impl SchedulerState {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
            inner: Mutex::new(Inner {
                active: 0,
                cancelled: HashSet::new(),
            }),
        }
    }

    /// Claim a download slot. Returns `false` when the bound is reached,
    /// in which case the job stays pending until a slot frees.
    pub fn try_claim_slot(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.active < self.max_concurrent {
            inner.active += 1;
            true
        } else {
            false
        }
    }

    /// Release a slot claimed by a finished job.
    pub fn release_slot(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.active = inner.active.saturating_sub(1);
    }

    /// Number of downloads currently holding a slot.
    pub fn active_count(&self) -> usize {
        self.inner.lock().unwrap().active
    }

    /// Flag a running job for cancellation. The download loop observes
    /// the flag between tracks.
    pub fn request_cancel(&self, job_id: DbId) {
        self.inner.lock().unwrap().cancelled.insert(job_id);
    }

    /// Whether a job has been flagged for cancellation.
    pub fn is_cancelled(&self, job_id: DbId) -> bool {
        self.inner.lock().unwrap().cancelled.contains(&job_id)
    }

    /// Drop a job's cancellation flag once the job is terminal.
    pub fn clear_cancelled(&self, job_id: DbId) {
        self.inner.lock().unwrap().cancelled.remove(&job_id);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
