//! Liveness endpoint. No auth; used by process managers and peers alike.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// `GET /health`: report process liveness and database reachability.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let db_healthy = cantata_db::health_check(&state.pool).await.is_ok();
    let status = if db_healthy { "ok" } else { "degraded" };
    Json(json!({
        "status": status,
        "version": env!("CARGO_PKG_VERSION"),
        "db_healthy": db_healthy,
    }))
}
