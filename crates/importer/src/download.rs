//! The per-job download sequence.
//!
//! Folder creation, artist/album rows, best-effort cover, then tracks in
//! strict (disc, track) order. A track's library row is inserted only
//! after its bytes are fully on disk, so the library never references a
//! half-written file. Cancellation is checked between tracks only;
//! partial downloads are left in place for an external cleanup pass.

use std::path::Path;

use futures::TryStreamExt;
use tokio::io::AsyncWriteExt;

use cantata_core::error::CoreError;
use cantata_core::fsnames::{resolve_under_root, sanitize_name};
use cantata_core::import::progress_percent;
use cantata_db::models::import_job::ImportJob;
use cantata_db::models::library::{CreateAlbum, CreateTrack};
use cantata_db::repositories::{ImportJobRepo, LibraryRepo};
use cantata_peer::api::{AlbumDownloadManifest, ExportTrack};
use cantata_peer::{health, PeerClient};

use crate::error::ImportError;
use crate::service::ImportService;

/// File name used for a downloaded album cover.
const COVER_FILE_NAME: &str = "cover.jpg";

/// Fallback extension when a track URL carries none.
const DEFAULT_TRACK_EXT: &str = "audio";

/// How a download loop ended short of an error.
pub(crate) enum DownloadOutcome {
    Completed,
    Cancelled,
}

/// Run one job's download to completion, cancellation, or first fatal
/// error. The caller owns terminal status persistence and slot release.
pub(crate) async fn run(
    service: &ImportService,
    job: &ImportJob,
) -> Result<DownloadOutcome, ImportError> {
    let server = service.source_server(job).await?;
    let client = PeerClient::new(&server.base_url, &server.token)?;

    let manifest = match client.album_download(&job.remote_album_id).await {
        Ok(manifest) => manifest,
        Err(err) => {
            health::record_failure(service.pool(), server.id, &err).await?;
            return Err(err.into());
        }
    };

    let tracks = ordered_tracks(&manifest)?;

    let total_tracks = tracks.len() as i32;
    let total_size = tracks.iter().filter_map(|(t, _)| t.track.file_size).sum::<i64>();

    let artist_dir = sanitize_name(&manifest.album.artist);
    let album_dir = sanitize_name(&manifest.album.name);
    let album_path = resolve_under_root(&service.library_root, &[&artist_dir, &album_dir])?;
    tokio::fs::create_dir_all(&album_path).await?;

    let artist = LibraryRepo::get_or_create_artist(service.pool(), &manifest.album.artist).await?;
    let album = LibraryRepo::create_album(
        service.pool(),
        &CreateAlbum {
            artist_id: artist.id,
            name: manifest.album.name.clone(),
            year: manifest.album.year,
            cover_path: None,
        },
    )
    .await?;

    download_cover(service, &client, &manifest, album.id, &album_path).await;

    let mut downloaded_tracks = 0i32;
    let mut downloaded_size = 0i64;
    for (track, url) in tracks {
        if service.scheduler.is_cancelled(job.id) {
            tracing::info!(job_id = job.id, downloaded_tracks, "Import cancelled between tracks");
            return Ok(DownloadOutcome::Cancelled);
        }

        let file_name = track_file_name(track, url);
        let file_path = resolve_under_root(
            &service.library_root,
            &[&artist_dir, &album_dir, &file_name],
        )?;

        let written = write_track_bytes(&client, url, &file_path).await?;

        LibraryRepo::create_track(
            service.pool(),
            &CreateTrack {
                album_id: album.id,
                title: track.track.title.clone(),
                disc_number: track.track.disc_number,
                track_number: track.track.track_number,
                duration_secs: track.track.duration_secs,
                file_path: file_path.to_string_lossy().into_owned(),
                file_size: Some(written),
                rg_track_gain: track.rg_track_gain,
                rg_track_peak: track.rg_track_peak,
                rg_album_gain: track.rg_album_gain,
                rg_album_peak: track.rg_album_peak,
                musicbrainz_id: track.musicbrainz_id.clone(),
            },
        )
        .await?;

        downloaded_tracks += 1;
        downloaded_size += written;
        let progress = progress_percent(downloaded_tracks, total_tracks);
        ImportJobRepo::update_progress(
            service.pool(),
            job.id,
            downloaded_tracks,
            downloaded_size,
            progress,
        )
        .await?;
        service.publish_progress(
            job,
            progress,
            downloaded_tracks,
            downloaded_size,
            total_tracks,
            total_size,
        );
        tracing::debug!(
            job_id = job.id,
            track = %track.track.title,
            progress,
            "Track imported"
        );
    }

    Ok(DownloadOutcome::Completed)
}

/// Pair the manifest's tracks with their stream URLs in strict
/// (disc, track) order.
///
/// The two lists must be the same length; zipping a short `track_urls`
/// list would silently drop tracks and let the job complete incomplete.
fn ordered_tracks(
    manifest: &AlbumDownloadManifest,
) -> Result<Vec<(&ExportTrack, &str)>, ImportError> {
    let tracks = &manifest.album.tracks;
    if tracks.len() != manifest.track_urls.len() {
        return Err(CoreError::Validation(format!(
            "Malformed album manifest: {} tracks but {} stream URLs",
            tracks.len(),
            manifest.track_urls.len()
        ))
        .into());
    }

    // Pair before sorting so the pairs survive the reorder.
    let mut paired: Vec<(&ExportTrack, &str)> = tracks
        .iter()
        .zip(manifest.track_urls.iter().map(String::as_str))
        .collect();
    paired.sort_by_key(|(t, _)| (t.track.disc_number, t.track.track_number));
    Ok(paired)
}

/// Fetch and store the album cover. Best-effort: a missing or failed
/// cover never fails the job.
async fn download_cover(
    service: &ImportService,
    client: &PeerClient,
    manifest: &AlbumDownloadManifest,
    album_id: i64,
    album_path: &Path,
) {
    let Some(cover_url) = manifest.cover_url.as_deref() else {
        return;
    };
    match client.fetch_bytes(cover_url).await {
        Ok(bytes) => {
            let cover_path = album_path.join(COVER_FILE_NAME);
            match tokio::fs::write(&cover_path, &bytes).await {
                Ok(()) => {
                    let stored = cover_path.to_string_lossy().into_owned();
                    if let Err(err) =
                        LibraryRepo::set_album_cover(service.pool(), album_id, &stored).await
                    {
                        tracing::warn!(album_id, error = %err, "Failed to record cover path");
                    }
                }
                Err(err) => tracing::warn!(album_id, error = %err, "Failed to write cover file"),
            }
        }
        Err(err) => tracing::warn!(album_id, error = %err, "Cover download failed"),
    }
}

/// Stream one track's bytes to disk, returning the byte count written.
async fn write_track_bytes(
    client: &PeerClient,
    url: &str,
    path: &Path,
) -> Result<i64, ImportError> {
    let mut stream = client.stream_track(url).await?;
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0i64;
    while let Some(chunk) = stream.try_next().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as i64;
    }
    file.flush().await?;
    Ok(written)
}

/// Build a track's on-disk file name: `{disc}-{track} {title}.{ext}`,
/// sanitized, with the extension taken from the stream URL when present.
fn track_file_name(track: &ExportTrack, url: &str) -> String {
    let title = sanitize_name(&track.track.title);
    let ext = url_extension(url).unwrap_or(DEFAULT_TRACK_EXT);
    format!(
        "{}-{:02} {}.{}",
        track.track.disc_number, track.track.track_number, title, ext
    )
}

/// Extract a plausible file extension from a URL path, ignoring query
/// strings and over-long or non-alphanumeric suffixes.
fn url_extension(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next()?;
    let segment = path.rsplit('/').next()?;
    let (_, ext) = segment.rsplit_once('.')?;
    if !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(ext)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use cantata_peer::api::{AlbumExport, RemoteTrack};

    use super::*;

    fn manifest(tracks: Vec<ExportTrack>, track_urls: Vec<String>) -> AlbumDownloadManifest {
        AlbumDownloadManifest {
            album: AlbumExport {
                id: "a1".into(),
                name: "Album".into(),
                artist: "Artist".into(),
                year: None,
                tracks,
            },
            track_urls,
            cover_url: None,
        }
    }

    fn export_track(disc: i32, number: i32, title: &str) -> ExportTrack {
        ExportTrack {
            track: RemoteTrack {
                id: "t1".into(),
                title: title.into(),
                disc_number: disc,
                track_number: number,
                duration_secs: None,
                file_size: None,
            },
            rg_track_gain: None,
            rg_track_peak: None,
            rg_album_gain: None,
            rg_album_peak: None,
            musicbrainz_id: None,
        }
    }

    #[test]
    fn manifest_with_missing_stream_urls_is_rejected() {
        let short = manifest(
            vec![export_track(1, 1, "One"), export_track(1, 2, "Two")],
            vec!["/stream/1.flac".into()],
        );
        let err = ordered_tracks(&short).unwrap_err();
        assert!(
            err.to_string().contains("2 tracks but 1 stream URLs"),
            "{err}"
        );

        let long = manifest(
            vec![export_track(1, 1, "One")],
            vec!["/stream/1.flac".into(), "/stream/2.flac".into()],
        );
        assert!(ordered_tracks(&long).is_err());
    }

    #[test]
    fn tracks_keep_their_urls_across_the_sort() {
        let m = manifest(
            vec![
                export_track(2, 1, "Late"),
                export_track(1, 2, "Middle"),
                export_track(1, 1, "First"),
            ],
            vec!["/s/late".into(), "/s/middle".into(), "/s/first".into()],
        );
        let ordered = ordered_tracks(&m).unwrap();
        let pairs: Vec<(&str, &str)> = ordered
            .iter()
            .map(|(t, url)| (t.track.title.as_str(), *url))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("First", "/s/first"),
                ("Middle", "/s/middle"),
                ("Late", "/s/late"),
            ]
        );
    }

    #[test]
    fn extension_comes_from_the_url() {
        assert_eq!(url_extension("/api/federation/stream/9.flac"), Some("flac"));
        assert_eq!(
            url_extension("https://peer.example.org/stream/9.mp3?sig=abc"),
            Some("mp3")
        );
        assert_eq!(url_extension("/stream/9"), None);
        assert_eq!(url_extension("/stream/9.notanext"), None);
        assert_eq!(url_extension("/stream/9.f|x"), None);
    }

    #[test]
    fn track_file_names_are_safe_and_ordered() {
        let track = export_track(1, 3, "So What");
        assert_eq!(track_file_name(&track, "/stream/9.flac"), "1-03 So What.flac");

        let hostile = export_track(1, 1, "../../../etc/passwd");
        let name = track_file_name(&hostile, "/stream/9");
        assert!(!name.contains('/'), "{name}");
        assert!(name.ends_with(".audio"), "{name}");
    }

    #[test]
    fn hostile_track_names_never_escape_the_root() {
        let root = Path::new("/library");
        for title in ["../escape", "a/b\\c", "x\0y"] {
            let track = export_track(1, 1, title);
            let name = track_file_name(&track, "/stream/9.flac");
            let path = resolve_under_root(root, &["Artist", "Album", &name]).unwrap();
            assert!(path.starts_with(root), "{title:?} -> {path:?}");
        }
    }
}
