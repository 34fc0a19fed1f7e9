//! HTTP client for a single peer server's federation endpoint.

use std::time::Duration;

use futures::{Stream, TryStreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;

use cantata_core::token::token_hint;

use crate::api::{
    AlbumDownloadManifest, AlbumExport, ConnectRequest, ConnectResponse, LibrarySummary,
    PingResponse, RemoteAlbum, RemoteAlbumDetail, ServerInfo,
};
use crate::error::{classify_reqwest, PeerError};

/// Timeout for ordinary request/response calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout budget for calls that stream a whole file body.
pub const STREAMING_TIMEOUT: Duration = Duration::from_secs(60);

/// Path prefix of the federation surface on every peer.
const FEDERATION_PREFIX: &str = "/api/federation";

/// Client for one peer server.
///
/// Holds a normalized base URL (see `cantata_core::urls`) and the bearer
/// token stored on the connected-server row. Construction is cheap; the
/// underlying `reqwest::Client` pools connections internally.
pub struct PeerClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl PeerClient {
    /// Create an authenticated client for an already-connected peer.
    ///
    /// `base_url` must already be normalized.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, PeerError> {
        Self::build(base_url.into(), Some(token.into()))
    }

    /// Create an unauthenticated client, used only for the initial
    /// `/connect` handshake before any token exists.
    pub fn unauthenticated(base_url: impl Into<String>) -> Result<Self, PeerError> {
        Self::build(base_url.into(), None)
    }

    fn build(base_url: String, token: Option<String>) -> Result<Self, PeerError> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| PeerError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// The normalized base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -----------------------------------------------------------------------
    // Protocol calls
    // -----------------------------------------------------------------------

    /// Redeem an invitation on the peer, returning the minted token.
    pub async fn connect(&self, request: &ConnectRequest) -> Result<ConnectResponse, PeerError> {
        self.post_json("/connect", request).await
    }

    /// Liveness probe.
    pub async fn ping(&self) -> Result<PingResponse, PeerError> {
        self.get_json("/ping").await
    }

    /// Peer identity and library counts.
    pub async fn server_info(&self) -> Result<ServerInfo, PeerError> {
        self.get_json("/info").await
    }

    /// Library aggregate counts.
    pub async fn library_stats(&self) -> Result<LibrarySummary, PeerError> {
        self.get_json("/library").await
    }

    /// Browse the peer's albums.
    pub async fn list_albums(&self) -> Result<Vec<RemoteAlbum>, PeerError> {
        self.get_json("/albums").await
    }

    /// One album with its track listing.
    pub async fn album(&self, album_id: &str) -> Result<RemoteAlbumDetail, PeerError> {
        self.get_json(&format!("/albums/{album_id}")).await
    }

    /// Full metadata manifest for import.
    pub async fn album_export(&self, album_id: &str) -> Result<AlbumExport, PeerError> {
        self.get_json(&format!("/albums/{album_id}/export")).await
    }

    /// Export manifest plus per-track stream URLs.
    pub async fn album_download(
        &self,
        album_id: &str,
    ) -> Result<AlbumDownloadManifest, PeerError> {
        self.get_json(&format!("/albums/{album_id}/download")).await
    }

    /// Tell the peer we are going away. The caller deletes the local row
    /// regardless of the outcome.
    pub async fn disconnect(&self) -> Result<(), PeerError> {
        let url = self.federation_url("/disconnect");
        let response = self
            .authorized(self.client.post(&url))
            .send()
            .await
            .map_err(classify_reqwest)?;
        Self::check_status(&response)?;
        Ok(())
    }

    /// Fetch a small binary body (album cover) in one piece.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, PeerError> {
        let url = self.resolve_url(url);
        let response = self
            .authorized(self.client.get(&url))
            .timeout(STREAMING_TIMEOUT)
            .send()
            .await
            .map_err(classify_reqwest)?;
        Self::check_status(&response)?;
        let bytes = response.bytes().await.map_err(classify_reqwest)?;
        Ok(bytes.to_vec())
    }

    /// Open a streaming download of one track's bytes.
    ///
    /// The whole body must complete within [`STREAMING_TIMEOUT`].
    pub async fn stream_track(
        &self,
        url: &str,
    ) -> Result<impl Stream<Item = Result<bytes::Bytes, PeerError>>, PeerError> {
        let url = self.resolve_url(url);
        let response = self
            .authorized(self.client.get(&url))
            .timeout(STREAMING_TIMEOUT)
            .send()
            .await
            .map_err(classify_reqwest)?;
        Self::check_status(&response)?;
        Ok(response.bytes_stream().map_err(classify_reqwest))
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn federation_url(&self, path: &str) -> String {
        format!("{}{FEDERATION_PREFIX}{path}", self.base_url)
    }

    /// Manifest URLs may be absolute or server-relative.
    fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}{}", self.base_url, url)
        }
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn check_status(response: &reqwest::Response) -> Result<(), PeerError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(PeerError::Http(status.as_u16()))
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, PeerError> {
        let url = self.federation_url(path);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(classify_reqwest)?;
        Self::check_status(&response)?;
        tracing::debug!(
            url = %url,
            token = %self.token.as_deref().map(token_hint).unwrap_or_default(),
            "peer request ok"
        );
        response.json::<T>().await.map_err(classify_reqwest)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, PeerError> {
        let url = self.federation_url(path);
        let response = self
            .authorized(self.client.post(&url))
            .json(body)
            .send()
            .await
            .map_err(classify_reqwest)?;
        Self::check_status(&response)?;
        response.json::<T>().await.map_err(classify_reqwest)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn federation_urls_are_prefixed() {
        let client = PeerClient::new("https://peer.example.org", "tok").unwrap();
        assert_eq!(
            client.federation_url("/albums/7"),
            "https://peer.example.org/api/federation/albums/7"
        );
    }

    #[test]
    fn relative_manifest_urls_resolve_against_base() {
        let client = PeerClient::new("https://peer.example.org", "tok").unwrap();
        assert_eq!(
            client.resolve_url("/api/federation/stream/3"),
            "https://peer.example.org/api/federation/stream/3"
        );
        assert_eq!(
            client.resolve_url("https://cdn.example.org/cover.jpg"),
            "https://cdn.example.org/cover.jpg"
        );
    }
}
