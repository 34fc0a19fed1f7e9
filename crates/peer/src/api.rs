//! Wire types for the federation protocol.
//!
//! These structs are both sides of the same protocol: the inbound API
//! serializes them and [`PeerClient`](crate::client::PeerClient)
//! deserializes them, so the two cannot drift apart.
//!
//! All ids are strings on the wire — a remote server's id scheme is
//! opaque to us.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Connect / identity
// ---------------------------------------------------------------------------

/// Body of `POST /connect`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectRequest {
    pub invitation_token: String,
    pub server_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
    /// Ask the issuing server to open a reverse connection.
    #[serde(default)]
    pub request_mutual: bool,
    /// Invitation code for the reverse connection, minted by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutual_invitation_token: Option<String>,
}

/// Successful response to `POST /connect`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectResponse {
    /// Long-lived bearer token for all subsequent calls.
    pub access_token: String,
    pub server_info: ServerInfo,
}

/// Response to `GET /info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub album_count: i64,
    pub track_count: i64,
    pub artist_count: i64,
}

/// Response to `GET /ping`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResponse {
    pub status: String,
}

/// Response to `GET /library`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibrarySummary {
    pub album_count: i64,
    pub track_count: i64,
    pub artist_count: i64,
}

// ---------------------------------------------------------------------------
// Browse
// ---------------------------------------------------------------------------

/// One album in a `GET /albums` listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteAlbum {
    pub id: String,
    pub name: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    pub track_count: i32,
}

/// Response to `GET /albums/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteAlbumDetail {
    #[serde(flatten)]
    pub album: RemoteAlbum,
    pub tracks: Vec<RemoteTrack>,
}

/// One track in a browse listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteTrack {
    pub id: String,
    pub title: String,
    pub disc_number: i32,
    pub track_number: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
}

// ---------------------------------------------------------------------------
// Export / download
// ---------------------------------------------------------------------------

/// Full track metadata carried by export and download manifests, for
/// faithful re-import on the pulling side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportTrack {
    #[serde(flatten)]
    pub track: RemoteTrack,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rg_track_gain: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rg_track_peak: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rg_album_gain: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rg_album_peak: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub musicbrainz_id: Option<String>,
}

/// Response to `GET /albums/{id}/export`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlbumExport {
    pub id: String,
    pub name: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    pub tracks: Vec<ExportTrack>,
}

/// Response to `GET /albums/{id}/download`: the export manifest plus the
/// URLs to pull bytes from. No ZIP packaging — the importer fetches
/// track by track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlbumDownloadManifest {
    #[serde(flatten)]
    pub album: AlbumExport,
    /// Stream URL per track, parallel to `album.tracks`.
    pub track_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
