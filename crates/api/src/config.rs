use std::path::PathBuf;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except `JWT_SECRET` have defaults suitable for local
/// development; override via environment variables in production.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Display name this server presents to peers.
    pub server_name: String,
    /// Publicly reachable base URL, sent to peers on connect so they can
    /// dial back for mutual federation.
    pub public_url: Option<String>,
    /// Root directory for imported album files.
    pub library_root: PathBuf,
    /// Bound on simultaneously downloading import jobs.
    pub max_concurrent_imports: usize,
    /// Permit loopback peer URLs (development only; logged when used).
    pub peer_allow_localhost: bool,
    /// JWT configuration for local-user auth.
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default         |
    /// |--------------------------|-----------------|
    /// | `HOST`                   | `0.0.0.0`       |
    /// | `PORT`                   | `3000`          |
    /// | `CORS_ORIGINS`           | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`            |
    /// | `SERVER_NAME`            | `Cantata`       |
    /// | `PUBLIC_URL`             | unset           |
    /// | `LIBRARY_ROOT`           | `./library`     |
    /// | `MAX_CONCURRENT_IMPORTS` | `2`             |
    /// | `PEER_ALLOW_LOCALHOST`   | `false`         |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let server_name =
            std::env::var("SERVER_NAME").unwrap_or_else(|_| "Cantata".to_string());
        let public_url = std::env::var("PUBLIC_URL").ok().filter(|s| !s.is_empty());

        let library_root = PathBuf::from(
            std::env::var("LIBRARY_ROOT").unwrap_or_else(|_| "./library".to_string()),
        );

        let max_concurrent_imports: usize = std::env::var("MAX_CONCURRENT_IMPORTS")
            .unwrap_or_else(|_| cantata_importer::DEFAULT_MAX_CONCURRENT.to_string())
            .parse()
            .expect("MAX_CONCURRENT_IMPORTS must be a valid usize");

        let peer_allow_localhost = std::env::var("PEER_ALLOW_LOCALHOST")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        if peer_allow_localhost {
            tracing::warn!("PEER_ALLOW_LOCALHOST is set: loopback peer URLs will be accepted");
        }

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            server_name,
            public_url,
            library_root,
            max_concurrent_imports,
            peer_allow_localhost,
            jwt: JwtConfig::from_env(),
        }
    }
}
