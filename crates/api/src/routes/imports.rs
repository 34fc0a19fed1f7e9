//! Route definitions for album imports and the progress feed.
//!
//! Mounted at `/imports`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::imports;
use crate::state::AppState;
use crate::ws;

/// Routes mounted at `/imports`.
///
/// ```text
/// GET    /              -> list_imports
/// POST   /              -> start_import
/// GET    /ws            -> progress WebSocket
/// GET    /{id}          -> get_import
/// POST   /{id}/cancel   -> cancel_import
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(imports::list_imports).post(imports::start_import))
        .route("/ws", get(ws::progress_ws))
        .route("/{id}", get(imports::get_import))
        .route("/{id}/cancel", post(imports::cancel_import))
}
