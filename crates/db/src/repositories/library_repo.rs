//! Repository for the local library tables: `artists`, `albums`, `tracks`.
//!
//! Only the operations the federation surface and the import pipeline
//! need; general library administration lives elsewhere.

use sqlx::PgPool;

use cantata_core::types::DbId;

use crate::models::library::{
    Album, AlbumSummary, AlbumWithArtist, Artist, CreateAlbum, CreateTrack, LibraryStats, Track,
};

const ARTIST_COLUMNS: &str = "id, name, created_at, updated_at";

const ALBUM_COLUMNS: &str = "id, artist_id, name, year, cover_path, created_at, updated_at";

const ALBUM_QUALIFIED_COLUMNS: &str =
    "al.id, al.artist_id, al.name, al.year, al.cover_path, al.created_at, al.updated_at";

const ALBUM_WITH_ARTIST_COLUMNS: &str = "\
    al.id, al.artist_id, al.name, al.year, al.cover_path, ar.name AS artist_name";

const TRACK_COLUMNS: &str = "\
    id, album_id, title, disc_number, track_number, duration_secs, \
    file_path, file_size, rg_track_gain, rg_track_peak, rg_album_gain, \
    rg_album_peak, musicbrainz_id, created_at";

/// Provides the library operations used by federation and imports.
pub struct LibraryRepo;

impl LibraryRepo {
    // -----------------------------------------------------------------------
    // Artists
    // -----------------------------------------------------------------------

    /// Get or create an artist by case-insensitive name.
    ///
    /// `ON CONFLICT ... DO UPDATE` on the functional unique index makes
    /// this safe under concurrent imports of the same artist.
    pub async fn get_or_create_artist(pool: &PgPool, name: &str) -> Result<Artist, sqlx::Error> {
        let query = format!(
            "INSERT INTO artists (name) VALUES ($1) \
             ON CONFLICT (LOWER(name)) DO UPDATE SET updated_at = NOW() \
             RETURNING {ARTIST_COLUMNS}"
        );
        sqlx::query_as::<_, Artist>(&query)
            .bind(name)
            .fetch_one(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Albums
    // -----------------------------------------------------------------------

    /// Case-insensitive duplicate check on (album name, artist name).
    pub async fn find_album_by_names(
        pool: &PgPool,
        album_name: &str,
        artist_name: &str,
    ) -> Result<Option<Album>, sqlx::Error> {
        let query = format!(
            "SELECT {ALBUM_QUALIFIED_COLUMNS} FROM albums al \
             JOIN artists ar ON ar.id = al.artist_id \
             WHERE LOWER(al.name) = LOWER($1) AND LOWER(ar.name) = LOWER($2)"
        );
        sqlx::query_as::<_, Album>(&query)
            .bind(album_name)
            .bind(artist_name)
            .fetch_optional(pool)
            .await
    }

    /// Insert a new album.
    pub async fn create_album(pool: &PgPool, input: &CreateAlbum) -> Result<Album, sqlx::Error> {
        let query = format!(
            "INSERT INTO albums (artist_id, name, year, cover_path) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {ALBUM_COLUMNS}"
        );
        sqlx::query_as::<_, Album>(&query)
            .bind(input.artist_id)
            .bind(&input.name)
            .bind(input.year)
            .bind(&input.cover_path)
            .fetch_one(pool)
            .await
    }

    /// Record the cover path once the cover file is on disk.
    pub async fn set_album_cover(
        pool: &PgPool,
        album_id: DbId,
        cover_path: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE albums SET cover_path = $2, updated_at = NOW() WHERE id = $1")
            .bind(album_id)
            .bind(cover_path)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Find an album by id, joined with its artist name.
    pub async fn find_album(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<AlbumWithArtist>, sqlx::Error> {
        let query = format!(
            "SELECT {ALBUM_WITH_ARTIST_COLUMNS} FROM albums al \
             JOIN artists ar ON ar.id = al.artist_id WHERE al.id = $1"
        );
        sqlx::query_as::<_, AlbumWithArtist>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all albums with artist names, for the browse surface.
    pub async fn list_albums(pool: &PgPool) -> Result<Vec<AlbumWithArtist>, sqlx::Error> {
        let query = format!(
            "SELECT {ALBUM_WITH_ARTIST_COLUMNS} FROM albums al \
             JOIN artists ar ON ar.id = al.artist_id \
             ORDER BY ar.name, al.year NULLS LAST, al.name"
        );
        sqlx::query_as::<_, AlbumWithArtist>(&query)
            .fetch_all(pool)
            .await
    }

    /// List albums with artist names and track counts, for `/albums`.
    pub async fn list_album_summaries(pool: &PgPool) -> Result<Vec<AlbumSummary>, sqlx::Error> {
        sqlx::query_as::<_, AlbumSummary>(
            "SELECT al.id, al.name, al.year, al.cover_path, ar.name AS artist_name, \
                    (SELECT COUNT(*) FROM tracks t WHERE t.album_id = al.id) AS track_count \
             FROM albums al \
             JOIN artists ar ON ar.id = al.artist_id \
             ORDER BY ar.name, al.year NULLS LAST, al.name",
        )
        .fetch_all(pool)
        .await
    }

    // -----------------------------------------------------------------------
    // Tracks
    // -----------------------------------------------------------------------

    /// Insert a track record. Called only after its bytes are fully
    /// written to `file_path`.
    pub async fn create_track(pool: &PgPool, input: &CreateTrack) -> Result<Track, sqlx::Error> {
        let query = format!(
            "INSERT INTO tracks \
                 (album_id, title, disc_number, track_number, duration_secs, \
                  file_path, file_size, rg_track_gain, rg_track_peak, \
                  rg_album_gain, rg_album_peak, musicbrainz_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {TRACK_COLUMNS}"
        );
        sqlx::query_as::<_, Track>(&query)
            .bind(input.album_id)
            .bind(&input.title)
            .bind(input.disc_number)
            .bind(input.track_number)
            .bind(input.duration_secs)
            .bind(&input.file_path)
            .bind(input.file_size)
            .bind(input.rg_track_gain)
            .bind(input.rg_track_peak)
            .bind(input.rg_album_gain)
            .bind(input.rg_album_peak)
            .bind(&input.musicbrainz_id)
            .fetch_one(pool)
            .await
    }

    /// Find a track by id.
    pub async fn find_track(pool: &PgPool, id: DbId) -> Result<Option<Track>, sqlx::Error> {
        let query = format!("SELECT {TRACK_COLUMNS} FROM tracks WHERE id = $1");
        sqlx::query_as::<_, Track>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List an album's tracks in playback order.
    pub async fn list_album_tracks(
        pool: &PgPool,
        album_id: DbId,
    ) -> Result<Vec<Track>, sqlx::Error> {
        let query = format!(
            "SELECT {TRACK_COLUMNS} FROM tracks \
             WHERE album_id = $1 ORDER BY disc_number, track_number"
        );
        sqlx::query_as::<_, Track>(&query)
            .bind(album_id)
            .fetch_all(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Stats
    // -----------------------------------------------------------------------

    /// Aggregate counts for `/library` and `/info`.
    pub async fn stats(pool: &PgPool) -> Result<LibraryStats, sqlx::Error> {
        sqlx::query_as::<_, LibraryStats>(
            "SELECT \
                 (SELECT COUNT(*) FROM albums)  AS album_count, \
                 (SELECT COUNT(*) FROM tracks)  AS track_count, \
                 (SELECT COUNT(*) FROM artists) AS artist_count",
        )
        .fetch_one(pool)
        .await
    }
}
