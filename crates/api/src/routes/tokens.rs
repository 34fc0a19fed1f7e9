//! Route definitions for issued access tokens.
//!
//! Mounted at `/tokens`.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers::tokens;
use crate::state::AppState;

/// Routes mounted at `/tokens`.
///
/// ```text
/// GET    /                       -> list_tokens
/// PUT    /{id}/permissions       -> update_permissions
/// POST   /{id}/revoke            -> revoke_token
/// POST   /{id}/reactivate        -> reactivate_token
/// DELETE /{id}                   -> delete_token
/// POST   /{id}/mutual/approve    -> approve_mutual
/// POST   /{id}/mutual/reject     -> reject_mutual
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(tokens::list_tokens))
        .route("/{id}/permissions", put(tokens::update_permissions))
        .route("/{id}/revoke", post(tokens::revoke_token))
        .route("/{id}/reactivate", post(tokens::reactivate_token))
        .route("/{id}", delete(tokens::delete_token))
        .route("/{id}/mutual/approve", post(tokens::approve_mutual))
        .route("/{id}/mutual/reject", post(tokens::reject_mutual))
}
