//! Shared helpers for HTTP-level integration tests.
//!
//! [`build_test_app`] mirrors the router construction in `main.rs` so the
//! tests exercise the same middleware stack (CORS, request ID, timeout,
//! tracing, panic recovery) that production uses.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use cantata_api::auth::jwt::{generate_token, JwtConfig};
use cantata_api::config::ServerConfig;
use cantata_api::router::build_app_router;
use cantata_api::state::AppState;
use cantata_db::models::user::User;
use cantata_db::repositories::UserRepo;
use cantata_events::ProgressBus;
use cantata_federation::{ConnectorConfig, ServerConnector, TokenService};
use cantata_importer::{ImportService, ImporterConfig};

/// Fixed signing secret for test JWTs.
const TEST_JWT_SECRET: &str = "integration-test-secret";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(library_root: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        server_name: "Test Cantata".to_string(),
        public_url: None,
        library_root: library_root.to_path_buf(),
        max_concurrent_imports: 2,
        peer_allow_localhost: true,
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            expiry_mins: 60,
        },
    }
}

/// Build the full application router over the given pool, with the
/// library root pointed at `library_root`.
pub fn build_test_app_with_root(pool: PgPool, library_root: &Path) -> Router {
    let config = test_config(library_root);
    let bus = Arc::new(ProgressBus::default());

    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(config.clone()),
        bus: Arc::clone(&bus),
        tokens: Arc::new(TokenService::new(pool.clone())),
        connector: Arc::new(ServerConnector::new(
            pool.clone(),
            ConnectorConfig {
                server_name: config.server_name.clone(),
                public_url: config.public_url.clone(),
                allow_localhost: config.peer_allow_localhost,
            },
        )),
        importer: ImportService::new(pool, bus, ImporterConfig::new(library_root)),
    };

    build_app_router(state, &config)
}

/// Build the application router with a throwaway library root.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with_root(pool, &std::env::temp_dir())
}

/// Seed a local user and return it with a valid JWT for the `Authorization`
/// header.
pub async fn seed_user(pool: &PgPool, username: &str) -> (User, String) {
    let user = UserRepo::create(pool, username)
        .await
        .expect("user creation should succeed");
    let jwt_config = JwtConfig {
        secret: TEST_JWT_SECRET.to_string(),
        expiry_mins: 60,
    };
    let token = generate_token(user.id, &jwt_config).expect("token generation should succeed");
    (user, token)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("GET")
            .uri(uri)
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("authorization", format!("Bearer {token}"))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("PUT")
            .uri(uri)
            .header("authorization", format!("Bearer {token}"))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Collect a response body's raw bytes.
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes()
        .to_vec()
}

/// Decode a response body into JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be valid JSON")
}
