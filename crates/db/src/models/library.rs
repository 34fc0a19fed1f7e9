//! Local library entity models: artists, albums, tracks.

use serde::Serialize;
use sqlx::FromRow;

use cantata_core::types::{DbId, Timestamp};

/// A row from the `artists` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Artist {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `albums` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Album {
    pub id: DbId,
    pub artist_id: DbId,
    pub name: String,
    pub year: Option<i32>,
    pub cover_path: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// An album joined with its artist name, for listings and manifests.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AlbumWithArtist {
    pub id: DbId,
    pub artist_id: DbId,
    pub name: String,
    pub year: Option<i32>,
    pub cover_path: Option<String>,
    pub artist_name: String,
}

/// A row from the `tracks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Track {
    pub id: DbId,
    pub album_id: DbId,
    pub title: String,
    pub disc_number: i32,
    pub track_number: i32,
    pub duration_secs: Option<f64>,
    pub file_path: String,
    pub file_size: Option<i64>,
    pub rg_track_gain: Option<f64>,
    pub rg_track_peak: Option<f64>,
    pub rg_album_gain: Option<f64>,
    pub rg_album_peak: Option<f64>,
    pub musicbrainz_id: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for inserting a new album.
#[derive(Debug, Clone)]
pub struct CreateAlbum {
    pub artist_id: DbId,
    pub name: String,
    pub year: Option<i32>,
    pub cover_path: Option<String>,
}

/// DTO for inserting a new track. Written only after the audio bytes are
/// fully on disk at `file_path`.
#[derive(Debug, Clone)]
pub struct CreateTrack {
    pub album_id: DbId,
    pub title: String,
    pub disc_number: i32,
    pub track_number: i32,
    pub duration_secs: Option<f64>,
    pub file_path: String,
    pub file_size: Option<i64>,
    pub rg_track_gain: Option<f64>,
    pub rg_track_peak: Option<f64>,
    pub rg_album_gain: Option<f64>,
    pub rg_album_peak: Option<f64>,
    pub musicbrainz_id: Option<String>,
}

/// An album listing row for the browse surface: artist name and track
/// count joined in.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AlbumSummary {
    pub id: DbId,
    pub name: String,
    pub year: Option<i32>,
    pub cover_path: Option<String>,
    pub artist_name: String,
    pub track_count: i64,
}

/// Aggregate counts for `/library` and `/info`.
#[derive(Debug, Clone, Copy, FromRow, Serialize)]
pub struct LibraryStats {
    pub album_count: i64,
    pub track_count: i64,
    pub artist_count: i64,
}
