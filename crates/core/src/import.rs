//! Import job status state machine and progress arithmetic.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Fixed failure reason applied by the startup crash-recovery sweep.
pub const ORPHANED_JOB_REASON: &str = "Interrupted by server restart";

/// Failure reason applied when the user cancels a running download.
pub const CANCELLED_BY_USER_REASON: &str = "Cancelled by user";

/// Lifecycle status of an album import job.
///
/// The only legal transitions are
/// `Pending -> Downloading -> {Completed, Failed, Cancelled}` plus the
/// direct `Pending -> Cancelled` flip for jobs that never started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Pending,
    Downloading,
    Completed,
    Failed,
    Cancelled,
}

impl ImportStatus {
    pub const ALL: [ImportStatus; 5] = [
        ImportStatus::Pending,
        ImportStatus::Downloading,
        ImportStatus::Completed,
        ImportStatus::Failed,
        ImportStatus::Cancelled,
    ];

    /// Stable string form, used as the database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStatus::Pending => "pending",
            ImportStatus::Downloading => "downloading",
            ImportStatus::Completed => "completed",
            ImportStatus::Failed => "failed",
            ImportStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "pending" => Ok(ImportStatus::Pending),
            "downloading" => Ok(ImportStatus::Downloading),
            "completed" => Ok(ImportStatus::Completed),
            "failed" => Ok(ImportStatus::Failed),
            "cancelled" => Ok(ImportStatus::Cancelled),
            other => Err(CoreError::Internal(format!(
                "Unknown import status '{other}'"
            ))),
        }
    }

    /// Whether the job has reached a final state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ImportStatus::Completed | ImportStatus::Failed | ImportStatus::Cancelled
        )
    }

    /// Whether the user may still cancel a job in this state.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, ImportStatus::Pending | ImportStatus::Downloading)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(&self, next: ImportStatus) -> bool {
        use ImportStatus::*;
        matches!(
            (self, next),
            (Pending, Downloading)
                | (Pending, Cancelled)
                | (Downloading, Completed)
                | (Downloading, Failed)
                | (Downloading, Cancelled)
        )
    }
}

impl std::fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whole-number progress percentage for `done` of `total` tracks.
///
/// Returns 0 when the total is unknown or zero; the result is clamped to
/// 0..=100 so counter glitches can never drive progress backwards past
/// the bounds the UI expects.
pub fn progress_percent(done: i32, total: i32) -> i32 {
    if total <= 0 {
        return 0;
    }
    let pct = (f64::from(done) / f64::from(total) * 100.0).round() as i32;
    pct.clamp(0, 100)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrips_through_strings() {
        for status in ImportStatus::ALL {
            assert_eq!(ImportStatus::parse(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_string_rejected() {
        assert!(ImportStatus::parse("paused").is_err());
    }

    /// Exhaustively verify the transition graph: everything not named in
    /// the doc comment is illegal, including self-transitions and any move
    /// out of a terminal state.
    #[test]
    fn transition_graph_is_exhaustive() {
        use ImportStatus::*;
        let legal = [
            (Pending, Downloading),
            (Pending, Cancelled),
            (Downloading, Completed),
            (Downloading, Failed),
            (Downloading, Cancelled),
        ];
        for from in ImportStatus::ALL {
            for to in ImportStatus::ALL {
                let expected = legal.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "{from} -> {to} should be {}",
                    if expected { "legal" } else { "illegal" }
                );
            }
        }
    }

    #[test]
    fn terminal_states_are_not_cancellable() {
        for status in ImportStatus::ALL {
            assert_ne!(status.is_terminal(), status.is_cancellable());
        }
    }

    #[test]
    fn progress_rounds_to_nearest() {
        assert_eq!(progress_percent(0, 10), 0);
        assert_eq!(progress_percent(5, 10), 50);
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(10, 10), 100);
    }

    #[test]
    fn progress_handles_degenerate_totals() {
        assert_eq!(progress_percent(5, 0), 0);
        assert_eq!(progress_percent(5, -1), 0);
        assert_eq!(progress_percent(20, 10), 100);
    }
}
