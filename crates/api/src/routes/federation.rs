//! Route definitions for the peer-facing federation surface.
//!
//! Mounted at `/api/federation`. Every route except `/connect` requires a
//! valid access token; `/connect` is where a peer trades an invitation code
//! for one.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::federation;
use crate::state::AppState;

/// Routes mounted at `/api/federation`.
///
/// ```text
/// POST   /connect                -> connect        (invitation code, public)
/// GET    /ping                   -> ping
/// GET    /info                   -> info
/// GET    /library                -> library        (browse)
/// GET    /albums                 -> list_albums    (browse)
/// GET    /albums/{id}            -> get_album      (browse)
/// GET    /albums/{id}/cover      -> album_cover    (browse)
/// GET    /stream/{track_id}      -> stream_track   (stream)
/// GET    /albums/{id}/export     -> export_album   (download)
/// GET    /albums/{id}/download   -> download_album (download)
/// POST   /disconnect             -> disconnect
/// ```
pub fn federation_routes() -> Router<AppState> {
    Router::new()
        .route("/connect", post(federation::connect))
        .route("/ping", get(federation::ping))
        .route("/info", get(federation::info))
        .route("/library", get(federation::library))
        .route("/albums", get(federation::list_albums))
        .route("/albums/{id}", get(federation::get_album))
        .route("/albums/{id}/cover", get(federation::album_cover))
        .route("/stream/{track_id}", get(federation::stream_track))
        .route("/albums/{id}/export", get(federation::export_album))
        .route("/albums/{id}/download", get(federation::download_album))
        .route("/disconnect", post(federation::disconnect))
}
