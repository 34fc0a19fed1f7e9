pub mod federation;
pub mod health;
pub mod imports;
pub mod invitations;
pub mod servers;
pub mod tokens;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree (local management surface, JWT auth).
///
/// Route hierarchy:
///
/// ```text
/// /invitations                         list, create
/// /invitations/cleanup                 purge expired/exhausted (POST)
/// /invitations/{id}                    delete
///
/// /tokens                              list issued access tokens
/// /tokens/{id}/permissions             update per-peer permissions (PUT)
/// /tokens/{id}/revoke                  revoke (POST)
/// /tokens/{id}/reactivate              reactivate (POST)
/// /tokens/{id}                         delete
/// /tokens/{id}/mutual/approve          approve mutual request (POST)
/// /tokens/{id}/mutual/reject           reject mutual request (POST)
///
/// /servers                             list, connect
/// /servers/{id}/sync                   probe + refresh metadata (POST)
/// /servers/{id}                        disconnect (DELETE)
///
/// /imports                             list, start
/// /imports/ws                          progress WebSocket
/// /imports/{id}                        get one job
/// /imports/{id}/cancel                 cancel (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/invitations", invitations::router())
        .nest("/tokens", tokens::router())
        .nest("/servers", servers::router())
        .nest("/imports", imports::router())
}
