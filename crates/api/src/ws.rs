//! Per-user import-progress WebSocket feed.
//!
//! On attach the client receives a snapshot of its non-terminal jobs
//! (rebuilt from the database, since the bus does not replay), then live
//! events filtered to the authenticated user. The socket is one transport
//! adapter over the bus; the orchestrator knows nothing about it.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use chrono::Utc;
use futures::{SinkExt, StreamExt};

use cantata_core::types::DbId;
use cantata_db::models::import_job::ImportJob;
use cantata_db::repositories::ImportJobRepo;
use cantata_events::ImportProgressEvent;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// `GET /imports/ws`: upgrade to the progress feed.
pub async fn progress_ws(
    ws: WebSocketUpgrade,
    user: AuthUser,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, user.user_id))
}

/// Rebuild a progress event from a job row, for the attach snapshot.
fn snapshot_event(job: &ImportJob) -> Option<ImportProgressEvent> {
    let status = job.import_status().ok()?;
    Some(ImportProgressEvent {
        job_id: job.id,
        user_id: job.user_id,
        status,
        progress: job.progress,
        downloaded_tracks: job.downloaded_tracks,
        total_tracks: job.total_tracks,
        downloaded_size: job.downloaded_size,
        total_size: job.total_size,
        error: job.error_message.clone(),
        timestamp: Utc::now(),
    })
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: DbId) {
    tracing::debug!(user_id, "Progress WebSocket connected");

    // Subscribe before reading the snapshot so no event can fall into the
    // gap between the two.
    let mut subscription = state.bus.subscribe_user(user_id);
    let (mut sink, mut stream) = socket.split();

    match ImportJobRepo::list_active_by_user(&state.pool, user_id).await {
        Ok(jobs) => {
            for event in jobs.iter().filter_map(snapshot_event) {
                if send_event(&mut sink, &event).await.is_err() {
                    return;
                }
            }
        }
        Err(err) => {
            tracing::warn!(user_id, error = %err, "Failed to load progress snapshot");
        }
    }

    loop {
        tokio::select! {
            event = subscription.recv() => {
                let Some(event) = event else { break };
                if send_event(&mut sink, &event).await.is_err() {
                    break;
                }
            }
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // clients only listen on this feed
                    Some(Err(err)) => {
                        tracing::debug!(user_id, error = %err, "WebSocket receive error");
                        break;
                    }
                }
            }
        }
    }

    tracing::debug!(user_id, "Progress WebSocket disconnected");
}

async fn send_event(
    sink: &mut (impl SinkExt<Message, Error = axum::Error> + Unpin),
    event: &ImportProgressEvent,
) -> Result<(), ()> {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(err) => {
            tracing::error!(error = %err, "Failed to serialize progress event");
            return Ok(());
        }
    };
    sink.send(Message::Text(json.into())).await.map_err(|_| ())
}
