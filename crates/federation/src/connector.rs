//! Outbound connections to peer servers.
//!
//! Redeems an invitation over the wire, stores the returned bearer token
//! as a `connected_servers` row, and handles disconnect and health sync.
//! Each direction of a mutual federation is its own row and its own
//! access token; nothing here models a bidirectional edge.

use sqlx::PgPool;

use cantata_core::error::CoreError;
use cantata_core::token::canonicalize_invitation_code;
use cantata_core::types::DbId;
use cantata_core::urls::{is_loopback_host, normalize_base_url};
use cantata_db::models::connected_server::{ConnectedServer, CreateConnectedServer};
use cantata_db::repositories::ConnectedServerRepo;
use cantata_peer::api::{ConnectRequest, ServerInfo};
use cantata_peer::{health, PeerClient, PeerError};

use crate::error::FederationError;

/// Configuration shared by every outbound connection attempt.
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    /// Display name this server presents to peers.
    pub server_name: String,
    /// Publicly reachable base URL of this server, sent to peers so they
    /// can dial back. Optional for servers that never request mutuals.
    pub public_url: Option<String>,
    /// Permit loopback peer URLs. Off by default; every accepted loopback
    /// URL is logged at warn.
    pub allow_localhost: bool,
}

/// Result of a successful outbound connect.
#[derive(Debug, Clone)]
pub struct ConnectOutcome {
    pub server: ConnectedServer,
    pub info: ServerInfo,
}

/// Opens, refreshes, and tears down outbound peer connections.
pub struct ServerConnector {
    pool: PgPool,
    config: ConnectorConfig,
}

impl ServerConnector {
    pub fn new(pool: PgPool, config: ConnectorConfig) -> Self {
        Self { pool, config }
    }

    /// Normalize and validate a peer URL under this connector's policy.
    pub fn normalize_url(&self, url: &str) -> Result<String, FederationError> {
        let normalized = normalize_base_url(url, self.config.allow_localhost)?;
        if self.config.allow_localhost {
            if let Some(host) = normalized.split("://").nth(1) {
                let hostname = host.split([':', '/']).next().unwrap_or("");
                if is_loopback_host(hostname) {
                    tracing::warn!(url = %normalized, "Loopback peer URL accepted (allow_localhost is set)");
                }
            }
        }
        Ok(normalized)
    }

    /// Connect to a peer by redeeming an invitation code.
    ///
    /// `mutual_code` is a locally issued invitation passed along so the
    /// peer can request the reverse connection.
    pub async fn connect_to_server(
        &self,
        user_id: DbId,
        url: &str,
        invitation_code: &str,
        mutual_code: Option<&str>,
    ) -> Result<ConnectOutcome, FederationError> {
        let base_url = self.normalize_url(url)?;

        if ConnectedServerRepo::find_by_url(&self.pool, user_id, &base_url)
            .await?
            .is_some()
        {
            return Err(CoreError::Conflict(format!(
                "Already connected to {base_url}"
            ))
            .into());
        }

        let client = PeerClient::unauthenticated(&base_url)?;
        let request = ConnectRequest {
            invitation_token: canonicalize_invitation_code(invitation_code),
            server_name: self.config.server_name.clone(),
            server_url: self.config.public_url.clone(),
            request_mutual: mutual_code.is_some(),
            mutual_invitation_token: mutual_code.map(canonicalize_invitation_code),
        };

        let response = match client.connect(&request).await {
            Ok(response) => response,
            Err(PeerError::Http(401)) => {
                return Err(CoreError::Unauthorized(
                    "The peer rejected the invitation code".into(),
                )
                .into());
            }
            Err(err) => return Err(err.into()),
        };

        let server = ConnectedServerRepo::create(
            &self.pool,
            &CreateConnectedServer {
                user_id,
                name: response.server_info.name.clone(),
                base_url,
                token: response.access_token,
            },
        )
        .await?;
        health::record_success(&self.pool, server.id, Some(&response.server_info)).await?;

        tracing::info!(
            server_id = server.id,
            user_id,
            url = %server.base_url,
            "Connected to peer server"
        );
        Ok(ConnectOutcome {
            server,
            info: response.server_info,
        })
    }

    /// Disconnect from a peer: notify it best-effort, then delete the row.
    pub async fn disconnect(&self, server: &ConnectedServer) -> Result<(), FederationError> {
        match PeerClient::new(&server.base_url, &server.token) {
            Ok(client) => {
                if let Err(err) = client.disconnect().await {
                    tracing::warn!(
                        server_id = server.id,
                        error = %err,
                        "Peer disconnect notification failed; removing row anyway"
                    );
                }
            }
            Err(err) => {
                tracing::warn!(server_id = server.id, error = %err, "Could not build peer client for disconnect");
            }
        }

        if !ConnectedServerRepo::delete(&self.pool, server.id, server.user_id).await? {
            return Err(FederationError::not_found("ConnectedServer", server.id));
        }
        tracing::info!(server_id = server.id, url = %server.base_url, "Disconnected from peer server");
        Ok(())
    }

    /// Probe a peer and refresh its row's online flag and cached counts.
    pub async fn sync_server(
        &self,
        server: &ConnectedServer,
    ) -> Result<ConnectedServer, FederationError> {
        let client = PeerClient::new(&server.base_url, &server.token)?;
        health::check_server(&self.pool, server.id, &client).await?;

        ConnectedServerRepo::find_by_id(&self.pool, server.id)
            .await?
            .ok_or_else(|| FederationError::not_found("ConnectedServer", server.id))
    }
}
