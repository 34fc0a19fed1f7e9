use std::sync::Arc;

use cantata_events::ProgressBus;
use cantata_federation::{ServerConnector, TokenService};
use cantata_importer::ImportService;

use crate::config::ServerConfig;

/// Shared application state available to all handlers via `State<AppState>`.
///
/// Cheaply cloneable; all inner data is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: cantata_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Import-progress broadcast bus.
    pub bus: Arc<ProgressBus>,
    /// Invitation and access-token service.
    pub tokens: Arc<TokenService>,
    /// Outbound peer connection service.
    pub connector: Arc<ServerConnector>,
    /// Album import orchestrator.
    pub importer: Arc<ImportService>,
}
