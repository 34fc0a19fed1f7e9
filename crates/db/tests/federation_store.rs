//! Integration tests for the federation store against a real database.
//!
//! The headline property lives here: concurrent redemption of a
//! `max_uses = 1` invitation succeeds exactly once, because the consume
//! step is a single atomic conditional update.

use chrono::{Duration, Utc};
use sqlx::PgPool;

use cantata_core::import::{ImportStatus, ORPHANED_JOB_REASON};
use cantata_core::permissions::Permissions;
use cantata_db::models::access_token::{mutual_status, CreateAccessToken};
use cantata_db::models::import_job::CreateImportJob;
use cantata_db::models::invitation::{CreateInvitation, RedemptionMeta};
use cantata_db::repositories::{
    AccessTokenRepo, ConnectedServerRepo, ImportJobRepo, InvitationRepo, UserRepo,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_user(pool: &PgPool, name: &str) -> i64 {
    UserRepo::create(pool, name).await.unwrap().id
}

fn invitation(owner: i64, token: &str, max_uses: i32, ttl_days: i64) -> CreateInvitation {
    CreateInvitation {
        token: token.to_string(),
        name: None,
        created_by: owner,
        expires_at: Utc::now() + Duration::days(ttl_days),
        max_uses,
    }
}

fn access_token(owner: i64, token: &str) -> CreateAccessToken {
    CreateAccessToken {
        token: token.to_string(),
        user_id: owner,
        server_name: "peer".to_string(),
        server_url: None,
        permissions: Permissions::default_for_new_peer(),
        expires_at: None,
        mutual_invitation_token: None,
    }
}

async fn seed_server(pool: &PgPool, owner: i64, url: &str) -> i64 {
    ConnectedServerRepo::create(
        pool,
        &cantata_db::models::connected_server::CreateConnectedServer {
            user_id: owner,
            name: "peer".to_string(),
            base_url: url.to_string(),
            token: "secret".to_string(),
        },
    )
    .await
    .unwrap()
    .id
}

fn import_job(owner: i64, server: i64, album: &str) -> CreateImportJob {
    CreateImportJob {
        user_id: owner,
        server_id: server,
        remote_album_id: album.to_string(),
        album_name: "Album".to_string(),
        artist_name: "Artist".to_string(),
        total_tracks: 0,
        total_size: 0,
    }
}

// ---------------------------------------------------------------------------
// Invitation redemption
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn concurrent_redemption_single_use_yields_one_success(pool: PgPool) {
    let owner = seed_user(&pool, "alice").await;
    InvitationRepo::create(&pool, &invitation(owner, "RACE-CODE", 1, 7))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            let meta = RedemptionMeta {
                server_name: "peer",
                source_ip: None,
            };
            InvitationRepo::consume(&pool, "RACE-CODE", &meta)
                .await
                .unwrap()
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().is_some() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1, "exactly one concurrent redemption may win");

    let row: (i32, i32, bool) = sqlx::query_as(
        "SELECT current_uses, max_uses, is_used FROM invitation_tokens WHERE token = $1",
    )
    .bind("RACE-CODE")
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(row.0, row.1, "current_uses must equal max_uses");
    assert!(row.2, "invitation must be flagged used");
}

#[sqlx::test(migrations = "../../migrations")]
async fn multi_use_invitation_allows_exactly_max_uses(pool: PgPool) {
    let owner = seed_user(&pool, "alice").await;
    InvitationRepo::create(&pool, &invitation(owner, "MULTI-CODE", 3, 7))
        .await
        .unwrap();

    let meta = RedemptionMeta {
        server_name: "peer",
        source_ip: Some("10.0.0.7"),
    };
    for _ in 0..3 {
        assert!(InvitationRepo::consume(&pool, "MULTI-CODE", &meta)
            .await
            .unwrap()
            .is_some());
    }
    assert!(InvitationRepo::consume(&pool, "MULTI-CODE", &meta)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn expired_invitation_never_redeems(pool: PgPool) {
    let owner = seed_user(&pool, "alice").await;
    let mut input = invitation(owner, "OLD-CODE", 5, 7);
    input.expires_at = Utc::now() - Duration::hours(1);
    InvitationRepo::create(&pool, &input).await.unwrap();

    let meta = RedemptionMeta {
        server_name: "peer",
        source_ip: None,
    };
    assert!(
        InvitationRepo::consume(&pool, "OLD-CODE", &meta)
            .await
            .unwrap()
            .is_none(),
        "expired invitation must not redeem even with uses left"
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn unknown_code_yields_none_not_error(pool: PgPool) {
    let meta = RedemptionMeta {
        server_name: "peer",
        source_ip: None,
    };
    assert!(InvitationRepo::consume(&pool, "NO-SUCH-CODE", &meta)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn expiry_sweep_removes_only_expired_rows(pool: PgPool) {
    let owner = seed_user(&pool, "alice").await;
    let mut expired = invitation(owner, "GONE-CODE", 1, 7);
    expired.expires_at = Utc::now() - Duration::days(1);
    InvitationRepo::create(&pool, &expired).await.unwrap();
    InvitationRepo::create(&pool, &invitation(owner, "LIVE-CODE", 1, 7))
        .await
        .unwrap();

    let removed = InvitationRepo::delete_expired(&pool).await.unwrap();
    assert_eq!(removed, 1);

    let remaining = InvitationRepo::list_by_owner(&pool, owner).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].token, "LIVE-CODE");
}

// ---------------------------------------------------------------------------
// Access tokens
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn revoke_and_reactivate_are_conditional(pool: PgPool) {
    let owner = seed_user(&pool, "alice").await;
    let token = AccessTokenRepo::create(&pool, &access_token(owner, "tok-1"))
        .await
        .unwrap();
    assert!(token.is_active);

    // Revoke works once, then reports no row matched.
    assert!(AccessTokenRepo::revoke(&pool, token.id).await.unwrap().is_some());
    assert!(AccessTokenRepo::revoke(&pool, token.id).await.unwrap().is_none());

    // Reactivate only from the revoked state.
    let restored = AccessTokenRepo::reactivate(&pool, token.id)
        .await
        .unwrap()
        .unwrap();
    assert!(restored.is_active);
    assert!(AccessTokenRepo::reactivate(&pool, token.id)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn hard_delete_removes_the_row_for_good(pool: PgPool) {
    let owner = seed_user(&pool, "alice").await;
    let token = AccessTokenRepo::create(&pool, &access_token(owner, "tok-2"))
        .await
        .unwrap();

    assert!(AccessTokenRepo::delete(&pool, token.id).await.unwrap());
    // No row left: nothing to reactivate.
    assert!(AccessTokenRepo::reactivate(&pool, token.id)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn mutual_resolution_requires_pending_state(pool: PgPool) {
    let owner = seed_user(&pool, "alice").await;
    let mut input = access_token(owner, "tok-3");
    input.mutual_invitation_token = Some("REV-CODE".to_string());
    let token = AccessTokenRepo::create(&pool, &input).await.unwrap();
    assert_eq!(token.mutual_status, mutual_status::PENDING);

    let approved = AccessTokenRepo::resolve_mutual(&pool, token.id, mutual_status::APPROVED)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(approved.mutual_status, mutual_status::APPROVED);

    // No longer pending: a second resolution finds nothing.
    assert!(
        AccessTokenRepo::resolve_mutual(&pool, token.id, mutual_status::REJECTED)
            .await
            .unwrap()
            .is_none()
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn token_without_mutual_code_has_no_pending_request(pool: PgPool) {
    let owner = seed_user(&pool, "alice").await;
    let token = AccessTokenRepo::create(&pool, &access_token(owner, "tok-4"))
        .await
        .unwrap();
    assert_eq!(token.mutual_status, mutual_status::NONE);
    assert!(
        AccessTokenRepo::resolve_mutual(&pool, token.id, mutual_status::APPROVED)
            .await
            .unwrap()
            .is_none()
    );
}

// ---------------------------------------------------------------------------
// Import jobs
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_active_import_is_detectable_without_second_row(pool: PgPool) {
    let owner = seed_user(&pool, "alice").await;
    let server = seed_server(&pool, owner, "https://peer.example.org").await;

    let first = ImportJobRepo::create(&pool, &import_job(owner, server, "alb-1"))
        .await
        .unwrap();

    let active = ImportJobRepo::find_active_for_album(&pool, owner, server, "alb-1")
        .await
        .unwrap();
    assert_eq!(active.unwrap().id, first.id);

    // A different album on the same server is not blocked.
    assert!(
        ImportJobRepo::find_active_for_album(&pool, owner, server, "alb-2")
            .await
            .unwrap()
            .is_none()
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn terminal_job_does_not_block_a_retry(pool: PgPool) {
    let owner = seed_user(&pool, "alice").await;
    let server = seed_server(&pool, owner, "https://peer.example.org").await;

    let job = ImportJobRepo::create(&pool, &import_job(owner, server, "alb-1"))
        .await
        .unwrap();
    ImportJobRepo::mark_downloading(&pool, job.id, 10, 1000)
        .await
        .unwrap();
    ImportJobRepo::fail(&pool, job.id, "network error").await.unwrap();

    assert!(
        ImportJobRepo::find_active_for_album(&pool, owner, server, "alb-1")
            .await
            .unwrap()
            .is_none(),
        "a failed job must not block a brand-new import"
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn status_updates_are_guarded_by_expected_state(pool: PgPool) {
    let owner = seed_user(&pool, "alice").await;
    let server = seed_server(&pool, owner, "https://peer.example.org").await;
    let job = ImportJobRepo::create(&pool, &import_job(owner, server, "alb-1"))
        .await
        .unwrap();

    // A pending job cannot complete or fail.
    assert!(ImportJobRepo::complete(&pool, job.id).await.unwrap().is_none());
    assert!(ImportJobRepo::fail(&pool, job.id, "x").await.unwrap().is_none());

    // pending -> downloading works once.
    assert!(ImportJobRepo::mark_downloading(&pool, job.id, 10, 1000)
        .await
        .unwrap()
        .is_some());
    assert!(ImportJobRepo::mark_downloading(&pool, job.id, 10, 1000)
        .await
        .unwrap()
        .is_none());

    // Now cancel_pending no longer applies, but fail does.
    assert!(ImportJobRepo::cancel_pending(&pool, job.id)
        .await
        .unwrap()
        .is_none());
    let failed = ImportJobRepo::fail(&pool, job.id, "boom").await.unwrap().unwrap();
    assert_eq!(failed.import_status().unwrap(), ImportStatus::Failed);

    // Terminal: nothing moves it again.
    assert!(ImportJobRepo::complete(&pool, job.id).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn mid_album_failure_preserves_partial_progress(pool: PgPool) {
    let owner = seed_user(&pool, "alice").await;
    let server = seed_server(&pool, owner, "https://peer.example.org").await;

    let job = ImportJobRepo::create(&pool, &import_job(owner, server, "alb-1"))
        .await
        .unwrap();
    ImportJobRepo::mark_downloading(&pool, job.id, 10, 10_000)
        .await
        .unwrap();

    // Five tracks land, then track six blows up.
    ImportJobRepo::update_progress(&pool, job.id, 5, 5_000, 50)
        .await
        .unwrap();
    let failed = ImportJobRepo::fail(&pool, job.id, "Track download failed: connection reset")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(failed.import_status().unwrap(), ImportStatus::Failed);
    assert_eq!(failed.downloaded_tracks, 5);
    assert_eq!(failed.progress, 50);
    assert_eq!(
        failed.error_message.as_deref(),
        Some("Track download failed: connection reset")
    );
    assert!(failed.completed_at.is_some());
}

#[sqlx::test(migrations = "../../migrations")]
async fn crash_sweep_fails_orphaned_downloading_jobs(pool: PgPool) {
    let owner = seed_user(&pool, "alice").await;
    let server = seed_server(&pool, owner, "https://peer.example.org").await;

    let orphan = ImportJobRepo::create(&pool, &import_job(owner, server, "alb-1"))
        .await
        .unwrap();
    ImportJobRepo::mark_downloading(&pool, orphan.id, 10, 1000)
        .await
        .unwrap();
    let pending = ImportJobRepo::create(&pool, &import_job(owner, server, "alb-2"))
        .await
        .unwrap();

    // Simulated restart: no in-memory state, just the sweep.
    let recovered = ImportJobRepo::recover_orphaned(&pool).await.unwrap();
    assert_eq!(recovered, 1);

    let swept = ImportJobRepo::find_by_id(&pool, orphan.id).await.unwrap().unwrap();
    assert_eq!(swept.import_status().unwrap(), ImportStatus::Failed);
    assert_eq!(swept.error_message.as_deref(), Some(ORPHANED_JOB_REASON));

    // Pending jobs are untouched by the sweep.
    let untouched = ImportJobRepo::find_by_id(&pool, pending.id).await.unwrap().unwrap();
    assert_eq!(untouched.import_status().unwrap(), ImportStatus::Pending);
}
