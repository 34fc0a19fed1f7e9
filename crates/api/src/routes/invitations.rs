//! Route definitions for invitation management.
//!
//! Mounted at `/invitations`.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::invitations;
use crate::state::AppState;

/// Routes mounted at `/invitations`.
///
/// ```text
/// GET    /              -> list_invitations
/// POST   /              -> create_invitation
/// POST   /cleanup       -> cleanup_invitations
/// DELETE /{id}          -> delete_invitation
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(invitations::list_invitations).post(invitations::create_invitation),
        )
        .route("/cleanup", post(invitations::cleanup_invitations))
        .route("/{id}", delete(invitations::delete_invitation))
}
