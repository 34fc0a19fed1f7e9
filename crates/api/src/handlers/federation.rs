//! Handlers for the peer-facing federation surface.
//!
//! Everything here is authenticated by federation access token (the
//! [`PeerAuth`] extractor), except `/connect` which is where such tokens
//! are minted. The wire types live in `cantata_peer::api` and are shared
//! with the outbound client, so the two sides cannot drift apart.

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use cantata_core::error::CoreError;
use cantata_core::types::DbId;
use cantata_db::models::library::{AlbumSummary, AlbumWithArtist, LibraryStats, Track};
use cantata_db::repositories::LibraryRepo;
use cantata_peer::api::{
    AlbumDownloadManifest, AlbumExport, ConnectRequest, ConnectResponse, ExportTrack,
    LibrarySummary, PingResponse, RemoteAlbum, RemoteAlbumDetail, RemoteTrack, ServerInfo,
};

use crate::error::{AppError, AppResult};
use crate::middleware::peer::PeerAuth;
use crate::range::{parse_range, ByteRange};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Wire-type mapping
// ---------------------------------------------------------------------------

fn server_info(state: &AppState, stats: &LibraryStats) -> ServerInfo {
    ServerInfo {
        name: state.config.server_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        album_count: stats.album_count,
        track_count: stats.track_count,
        artist_count: stats.artist_count,
    }
}

fn remote_album(album: &AlbumSummary) -> RemoteAlbum {
    RemoteAlbum {
        id: album.id.to_string(),
        name: album.name.clone(),
        artist: album.artist_name.clone(),
        year: album.year,
        track_count: album.track_count as i32,
    }
}

fn remote_track(track: &Track) -> RemoteTrack {
    RemoteTrack {
        id: track.id.to_string(),
        title: track.title.clone(),
        disc_number: track.disc_number,
        track_number: track.track_number,
        duration_secs: track.duration_secs,
        file_size: track.file_size,
    }
}

fn export_track(track: &Track) -> ExportTrack {
    ExportTrack {
        track: remote_track(track),
        rg_track_gain: track.rg_track_gain,
        rg_track_peak: track.rg_track_peak,
        rg_album_gain: track.rg_album_gain,
        rg_album_peak: track.rg_album_peak,
        musicbrainz_id: track.musicbrainz_id.clone(),
    }
}

async fn album_export(
    state: &AppState,
    album_id: DbId,
) -> AppResult<(AlbumWithArtist, AlbumExport)> {
    let album = LibraryRepo::find_album(&state.pool, album_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Album",
            id: album_id,
        }))?;
    let tracks = LibraryRepo::list_album_tracks(&state.pool, album_id).await?;
    let export = AlbumExport {
        id: album.id.to_string(),
        name: album.name.clone(),
        artist: album.artist_name.clone(),
        year: album.year,
        tracks: tracks.iter().map(export_track).collect(),
    };
    Ok((album, export))
}

// ---------------------------------------------------------------------------
// POST /connect
// ---------------------------------------------------------------------------

/// Redeem an invitation for a fresh access token.
///
/// Unknown, expired, and exhausted codes all come back as a plain 401;
/// peers learn nothing about which it was.
pub async fn connect(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ConnectRequest>,
) -> AppResult<impl IntoResponse> {
    let source_ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim);

    let mutual_code = request
        .mutual_invitation_token
        .as_deref()
        .filter(|_| request.request_mutual);

    let outcome = state
        .tokens
        .redeem_invitation(
            &request.invitation_token,
            &request.server_name,
            request.server_url.as_deref(),
            source_ip,
            mutual_code,
        )
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized("Invalid invitation token".into()))
        })?;

    let stats = LibraryRepo::stats(&state.pool).await?;
    Ok(Json(ConnectResponse {
        access_token: outcome.access_token.token,
        server_info: server_info(&state, &stats),
    }))
}

// ---------------------------------------------------------------------------
// GET /ping, GET /info, GET /library
// ---------------------------------------------------------------------------

/// Liveness probe; any valid token.
pub async fn ping(_peer: PeerAuth) -> Json<PingResponse> {
    Json(PingResponse {
        status: "ok".to_string(),
    })
}

/// Identity and library counts; any valid token.
pub async fn info(_peer: PeerAuth, State(state): State<AppState>) -> AppResult<Json<ServerInfo>> {
    let stats = LibraryRepo::stats(&state.pool).await?;
    Ok(Json(server_info(&state, &stats)))
}

/// Aggregate library counts; requires browse.
pub async fn library(
    peer: PeerAuth,
    State(state): State<AppState>,
) -> AppResult<Json<LibrarySummary>> {
    peer.require_browse()?;
    let stats = LibraryRepo::stats(&state.pool).await?;
    Ok(Json(LibrarySummary {
        album_count: stats.album_count,
        track_count: stats.track_count,
        artist_count: stats.artist_count,
    }))
}

// ---------------------------------------------------------------------------
// GET /albums, GET /albums/{id}, GET /albums/{id}/cover
// ---------------------------------------------------------------------------

/// Browse the album catalogue.
pub async fn list_albums(
    peer: PeerAuth,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<RemoteAlbum>>> {
    peer.require_browse()?;
    let albums = LibraryRepo::list_album_summaries(&state.pool).await?;
    Ok(Json(albums.iter().map(remote_album).collect()))
}

/// One album with its track listing.
pub async fn get_album(
    peer: PeerAuth,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<RemoteAlbumDetail>> {
    peer.require_browse()?;
    let (_, export) = album_export(&state, id).await?;
    Ok(Json(RemoteAlbumDetail {
        album: RemoteAlbum {
            id: export.id.clone(),
            name: export.name.clone(),
            artist: export.artist.clone(),
            year: export.year,
            track_count: export.tracks.len() as i32,
        },
        tracks: export.tracks.into_iter().map(|t| t.track).collect(),
    }))
}

/// The album's cover image, if one is on disk.
pub async fn album_cover(
    peer: PeerAuth,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Response> {
    peer.require_browse()?;
    let album = LibraryRepo::find_album(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Album",
            id,
        }))?;
    let cover_path = album.cover_path.ok_or(AppError::Core(CoreError::NotFound {
        entity: "AlbumCover",
        id,
    }))?;

    let bytes = tokio::fs::read(&cover_path).await.map_err(|err| {
        tracing::warn!(album_id = id, error = %err, "Cover file missing from disk");
        AppError::Core(CoreError::NotFound {
            entity: "AlbumCover",
            id,
        })
    })?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response())
}

// ---------------------------------------------------------------------------
// GET /stream/{track_id}
// ---------------------------------------------------------------------------

/// Stream a track's bytes, honoring a single-range `Range` header.
pub async fn stream_track(
    peer: PeerAuth,
    State(state): State<AppState>,
    Path(track_id): Path<DbId>,
    headers: HeaderMap,
) -> AppResult<Response> {
    peer.require_stream()?;
    let track = LibraryRepo::find_track(&state.pool, track_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Track",
            id: track_id,
        }))?;

    let mut file = tokio::fs::File::open(&track.file_path).await.map_err(|err| {
        tracing::error!(track_id, error = %err, "Track file missing from disk");
        AppError::InternalError("Track file is not available".to_string())
    })?;
    let total = file
        .metadata()
        .await
        .map_err(|err| AppError::InternalError(err.to_string()))?
        .len();

    let range_header = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok());

    match parse_range(range_header, total) {
        ByteRange::Full => {
            let mut body = Vec::with_capacity(total as usize);
            file.read_to_end(&mut body)
                .await
                .map_err(|err| AppError::InternalError(err.to_string()))?;
            Ok((
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/octet-stream".to_string()),
                    (header::ACCEPT_RANGES, "bytes".to_string()),
                ],
                body,
            )
                .into_response())
        }
        ByteRange::Partial { start, end } => {
            let len = end - start + 1;
            file.seek(std::io::SeekFrom::Start(start))
                .await
                .map_err(|err| AppError::InternalError(err.to_string()))?;
            let mut body = vec![0u8; len as usize];
            file.read_exact(&mut body)
                .await
                .map_err(|err| AppError::InternalError(err.to_string()))?;
            Ok((
                StatusCode::PARTIAL_CONTENT,
                [
                    (header::CONTENT_TYPE, "application/octet-stream".to_string()),
                    (header::ACCEPT_RANGES, "bytes".to_string()),
                    (
                        header::CONTENT_RANGE,
                        format!("bytes {start}-{end}/{total}"),
                    ),
                ],
                body,
            )
                .into_response())
        }
        ByteRange::Unsatisfiable => Ok((
            StatusCode::RANGE_NOT_SATISFIABLE,
            [(header::CONTENT_RANGE, format!("bytes */{total}"))],
        )
            .into_response()),
    }
}

// ---------------------------------------------------------------------------
// GET /albums/{id}/export, GET /albums/{id}/download
// ---------------------------------------------------------------------------

/// Full metadata manifest for re-import on the pulling side.
pub async fn export_album(
    peer: PeerAuth,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<AlbumExport>> {
    peer.require_download()?;
    let (_, export) = album_export(&state, id).await?;
    Ok(Json(export))
}

/// Export manifest plus per-track stream URLs. No ZIP packaging; the
/// importer on the other side pulls track by track.
pub async fn download_album(
    peer: PeerAuth,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<AlbumDownloadManifest>> {
    peer.require_download()?;
    let (album, export) = album_export(&state, id).await?;

    let track_urls = export
        .tracks
        .iter()
        .map(|t| format!("/api/federation/stream/{}", t.track.id))
        .collect();
    let cover_url = album
        .cover_path
        .as_ref()
        .map(|_| format!("/api/federation/albums/{id}/cover"));

    Ok(Json(AlbumDownloadManifest {
        album: export,
        track_urls,
        cover_url,
    }))
}

// ---------------------------------------------------------------------------
// POST /disconnect
// ---------------------------------------------------------------------------

/// Revoke the calling peer's own access token.
pub async fn disconnect(peer: PeerAuth, State(state): State<AppState>) -> AppResult<StatusCode> {
    state.tokens.revoke_token(peer.token.id).await?;
    tracing::info!(token_id = peer.token.id, peer = %peer.token.server_name, "Peer disconnected");
    Ok(StatusCode::NO_CONTENT)
}
