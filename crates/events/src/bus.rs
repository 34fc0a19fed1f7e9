//! In-process progress bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`ProgressBus`] is the single publish point for [`ImportProgressEvent`]s.
//! It is shared via `Arc<ProgressBus>` across the application; transports
//! (WebSocket today, anything else tomorrow) attach as independent filtered
//! subscribers and never touch the orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use cantata_core::import::ImportStatus;
use cantata_core::types::DbId;

// ---------------------------------------------------------------------------
// ImportProgressEvent
// ---------------------------------------------------------------------------

/// A snapshot of one import job's progress, published after every state
/// change and every finished track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportProgressEvent {
    /// Import job database id.
    pub job_id: DbId,

    /// Owner of the job; subscriptions filter on this.
    pub user_id: DbId,

    /// Current job status.
    pub status: ImportStatus,

    /// Whole-number percentage, 0–100, monotonically non-decreasing
    /// within one job.
    pub progress: i32,

    pub downloaded_tracks: i32,
    pub total_tracks: i32,
    pub downloaded_size: i64,
    pub total_size: i64,

    /// First fatal error message, present only on `failed` events.
    pub error: Option<String>,

    /// When the event was published (UTC).
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// ProgressBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out bus for import progress.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published event. There is no replay: a
/// subscriber only sees events published after it attached.
pub struct ProgressBus {
    sender: broadcast::Sender<ImportProgressEvent>,
}

impl ProgressBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped;
    /// the job row in the database remains the durable record.
    pub fn publish(&self, event: ImportProgressEvent) {
        // Ignore the SendError — it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to every event on the bus, unfiltered.
    pub fn subscribe(&self) -> broadcast::Receiver<ImportProgressEvent> {
        self.sender.subscribe()
    }

    /// Subscribe to the events belonging to a single user.
    pub fn subscribe_user(&self, user_id: DbId) -> UserSubscription {
        UserSubscription {
            user_id,
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for ProgressBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// A per-user filtered view of the bus.
///
/// Lagged gaps are skipped rather than surfaced: progress events are
/// snapshots, so missing an intermediate one is harmless.
pub struct UserSubscription {
    user_id: DbId,
    receiver: broadcast::Receiver<ImportProgressEvent>,
}

impl UserSubscription {
    /// Receive the next event for this subscription's user.
    ///
    /// Returns `None` once the bus is closed (all senders dropped).
    pub async fn recv(&mut self) -> Option<ImportProgressEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.user_id == self.user_id => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn event(job_id: DbId, user_id: DbId, status: ImportStatus, progress: i32) -> ImportProgressEvent {
        ImportProgressEvent {
            job_id,
            user_id,
            status,
            progress,
            downloaded_tracks: 0,
            total_tracks: 10,
            downloaded_size: 0,
            total_size: 0,
            error: None,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = ProgressBus::default();
        let mut rx = bus.subscribe();

        bus.publish(event(1, 7, ImportStatus::Downloading, 30));

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.job_id, 1);
        assert_eq!(received.user_id, 7);
        assert_eq!(received.progress, 30);
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = ProgressBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(event(1, 7, ImportStatus::Completed, 100));

        assert_eq!(rx1.recv().await.unwrap().job_id, 1);
        assert_eq!(rx2.recv().await.unwrap().job_id, 1);
    }

    #[tokio::test]
    async fn user_subscription_filters_other_users() {
        let bus = ProgressBus::default();
        let mut sub = bus.subscribe_user(7);

        bus.publish(event(1, 3, ImportStatus::Downloading, 10));
        bus.publish(event(2, 7, ImportStatus::Downloading, 20));

        let received = sub.recv().await.expect("user 7 event should arrive");
        assert_eq!(received.job_id, 2);
        assert_eq!(received.user_id, 7);
    }

    #[tokio::test]
    async fn subscriber_only_sees_events_after_attach() {
        let bus = ProgressBus::default();
        bus.publish(event(1, 7, ImportStatus::Completed, 100));

        let mut sub = bus.subscribe_user(7);
        bus.publish(event(2, 7, ImportStatus::Downloading, 50));

        let received = sub.recv().await.unwrap();
        assert_eq!(received.job_id, 2, "no replay of pre-attach events");
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = ProgressBus::default();
        bus.publish(event(1, 7, ImportStatus::Failed, 0));
    }

    #[tokio::test]
    async fn emission_order_is_preserved() {
        let bus = ProgressBus::default();
        let mut sub = bus.subscribe_user(7);

        for progress in [10, 20, 30] {
            bus.publish(event(1, 7, ImportStatus::Downloading, progress));
        }

        assert_eq!(sub.recv().await.unwrap().progress, 10);
        assert_eq!(sub.recv().await.unwrap().progress, 20);
        assert_eq!(sub.recv().await.unwrap().progress, 30);
    }
}
