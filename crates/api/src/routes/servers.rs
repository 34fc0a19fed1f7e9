//! Route definitions for outbound peer connections.
//!
//! Mounted at `/servers`.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::servers;
use crate::state::AppState;

/// Routes mounted at `/servers`.
///
/// ```text
/// GET    /              -> list_servers
/// POST   /              -> connect_server
/// POST   /{id}/sync     -> sync_server
/// DELETE /{id}          -> disconnect_server
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(servers::list_servers).post(servers::connect_server))
        .route("/{id}/sync", post(servers::sync_server))
        .route("/{id}", delete(servers::disconnect_server))
}
