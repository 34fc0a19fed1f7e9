//! HTTP-level integration tests for the local management API: invitation
//! lifecycle, access-token administration, mutual-federation requests, and
//! import-job lookups.

mod common;

use axum::http::StatusCode;
use axum::Router;
use chrono::{Duration, Utc};
use common::{
    body_json, delete_auth, get_auth, post_auth, post_json, post_json_auth, seed_user,
};
use sqlx::PgPool;

use cantata_db::models::invitation::CreateInvitation;
use cantata_db::repositories::InvitationRepo;

// ---------------------------------------------------------------------------
// Invitations
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn invitation_lifecycle(pool: PgPool) {
    let (_user, jwt) = seed_user(&pool, "owner").await;
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        app.clone(),
        "/api/v1/invitations",
        &jwt,
        serde_json::json!({ "name": "For my friend", "ttl_days": 14, "max_uses": 3 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert!(created["data"]["token"].is_string());
    assert_eq!(created["data"]["name"], "For my friend");
    assert_eq!(created["data"]["max_uses"], 3);
    let id = created["data"]["id"].as_i64().unwrap();

    let listed = body_json(get_auth(app.clone(), "/api/v1/invitations", &jwt).await).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);

    let response = delete_auth(app.clone(), &format!("/api/v1/invitations/{id}"), &jwt).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let listed = body_json(get_auth(app, "/api/v1/invitations", &jwt).await).await;
    assert!(listed["data"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn invitation_params_are_validated(pool: PgPool) {
    let (_user, jwt) = seed_user(&pool, "owner").await;
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        app,
        "/api/v1/invitations",
        &jwt,
        serde_json::json!({ "ttl_days": 0 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../migrations")]
async fn cleanup_sweeps_expired_invitations(pool: PgPool) {
    let (user, jwt) = seed_user(&pool, "owner").await;

    // Seed an already-expired invitation directly; the API refuses to
    // create one in the past.
    InvitationRepo::create(
        &pool,
        &CreateInvitation {
            token: "EXPIRED-TEST-CODE".to_string(),
            name: None,
            created_by: user.id,
            expires_at: Utc::now() - Duration::days(1),
            max_uses: 1,
        },
    )
    .await
    .unwrap();

    let app = common::build_test_app(pool);
    let response = post_auth(app, "/api/v1/invitations/cleanup", &jwt).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["removed"], 1);
}

// ---------------------------------------------------------------------------
// Access tokens
// ---------------------------------------------------------------------------

/// Connect one peer through the federation surface so the owner has a
/// token row to manage.
async fn connect_one_peer(app: Router, jwt: &str, server_name: &str, mutual: bool) {
    let response = post_json_auth(app.clone(), "/api/v1/invitations", jwt, serde_json::json!({}))
        .await;
    let code = body_json(response).await["data"]["token"]
        .as_str()
        .unwrap()
        .to_string();

    let mut body = serde_json::json!({
        "invitation_token": code,
        "server_name": server_name,
        "server_url": "https://peer.example.com",
    });
    if mutual {
        body["request_mutual"] = serde_json::json!(true);
        body["mutual_invitation_token"] = serde_json::json!("PEER-MINTED-CODE");
    }
    let response = post_json(app, "/api/federation/connect", body).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../migrations")]
async fn tokens_are_scoped_to_their_owner(pool: PgPool) {
    let (_owner, owner_jwt) = seed_user(&pool, "owner").await;
    let (_other, other_jwt) = seed_user(&pool, "other").await;
    let app = common::build_test_app(pool);

    connect_one_peer(app.clone(), &owner_jwt, "Peer One", false).await;

    let owned = body_json(get_auth(app.clone(), "/api/v1/tokens", &owner_jwt).await).await;
    assert_eq!(owned["data"].as_array().unwrap().len(), 1);
    let token_id = owned["data"][0]["id"].as_i64().unwrap();

    // The other user sees nothing and cannot touch the row.
    let others = body_json(get_auth(app.clone(), "/api/v1/tokens", &other_jwt).await).await;
    assert!(others["data"].as_array().unwrap().is_empty());

    let response = post_auth(
        app,
        &format!("/api/v1/tokens/{token_id}/revoke"),
        &other_jwt,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../migrations")]
async fn deleted_token_stays_gone(pool: PgPool) {
    let (_user, jwt) = seed_user(&pool, "owner").await;
    let app = common::build_test_app(pool);

    connect_one_peer(app.clone(), &jwt, "Peer One", false).await;
    let tokens = body_json(get_auth(app.clone(), "/api/v1/tokens", &jwt).await).await;
    let token_id = tokens["data"][0]["id"].as_i64().unwrap();

    let response = delete_auth(app.clone(), &format!("/api/v1/tokens/{token_id}"), &jwt).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = post_auth(
        app,
        &format!("/api/v1/tokens/{token_id}/reactivate"),
        &jwt,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Mutual federation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn mutual_request_can_be_rejected_once(pool: PgPool) {
    let (_user, jwt) = seed_user(&pool, "owner").await;
    let app = common::build_test_app(pool);

    connect_one_peer(app.clone(), &jwt, "Peer One", true).await;

    let tokens = body_json(get_auth(app.clone(), "/api/v1/tokens", &jwt).await).await;
    assert_eq!(tokens["data"][0]["mutual_status"], "pending");
    let token_id = tokens["data"][0]["id"].as_i64().unwrap();

    let response = post_auth(
        app.clone(),
        &format!("/api/v1/tokens/{token_id}/mutual/reject"),
        &jwt,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["mutual_status"], "rejected");

    // The request is no longer pending; rejecting again conflicts.
    let response = post_auth(
        app,
        &format!("/api/v1/tokens/{token_id}/mutual/reject"),
        &jwt,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../migrations")]
async fn plain_connect_leaves_no_pending_mutual(pool: PgPool) {
    let (_user, jwt) = seed_user(&pool, "owner").await;
    let app = common::build_test_app(pool);

    connect_one_peer(app.clone(), &jwt, "Peer One", false).await;

    let tokens = body_json(get_auth(app.clone(), "/api/v1/tokens", &jwt).await).await;
    assert_eq!(tokens["data"][0]["mutual_status"], "none");
    let token_id = tokens["data"][0]["id"].as_i64().unwrap();

    let response = post_auth(
        app,
        &format!("/api/v1/tokens/{token_id}/mutual/approve"),
        &jwt,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

// ---------------------------------------------------------------------------
// Servers
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn connect_server_rejects_invalid_url(pool: PgPool) {
    let (_user, jwt) = seed_user(&pool, "owner").await;
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        app,
        "/api/v1/servers",
        &jwt,
        serde_json::json!({ "url": "not a url", "invitation_code": "SOME-CODE" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../migrations")]
async fn server_list_starts_empty(pool: PgPool) {
    let (_user, jwt) = seed_user(&pool, "owner").await;
    let app = common::build_test_app(pool);

    let json = body_json(get_auth(app, "/api/v1/servers", &jwt).await).await;
    assert!(json["data"].as_array().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Imports
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn import_lookups_scope_to_owner(pool: PgPool) {
    let (_user, jwt) = seed_user(&pool, "owner").await;
    let app = common::build_test_app(pool);

    let json = body_json(get_auth(app.clone(), "/api/v1/imports", &jwt).await).await;
    assert!(json["data"].as_array().unwrap().is_empty());

    let response = get_auth(app.clone(), "/api/v1/imports/999", &jwt).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = post_auth(app.clone(), "/api/v1/imports/999/cancel", &jwt).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = post_json_auth(
        app,
        "/api/v1/imports",
        &jwt,
        serde_json::json!({ "server_id": 42, "remote_album_id": "abc" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
