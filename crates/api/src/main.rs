use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cantata_api::config::ServerConfig;
use cantata_api::router::build_app_router;
use cantata_api::state::AppState;
use cantata_events::ProgressBus;
use cantata_federation::{ConnectorConfig, ServerConnector, TokenService};
use cantata_importer::{ImportService, ImporterConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cantata=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

    let pool = cantata_db::create_pool(&database_url).await?;
    tracing::info!("Database connection pool created");

    cantata_db::health_check(&pool).await?;
    tracing::info!("Database health check passed");

    cantata_db::run_migrations(&pool).await?;
    tracing::info!("Database migrations applied");

    // --- Services ---
    let bus = Arc::new(ProgressBus::default());

    let tokens = Arc::new(TokenService::new(pool.clone()));

    let connector = Arc::new(ServerConnector::new(
        pool.clone(),
        ConnectorConfig {
            server_name: config.server_name.clone(),
            public_url: config.public_url.clone(),
            allow_localhost: config.peer_allow_localhost,
        },
    ));

    let importer = ImportService::new(pool.clone(), Arc::clone(&bus), ImporterConfig {
        library_root: config.library_root.clone(),
        max_concurrent: config.max_concurrent_imports,
    });

    // --- Startup sweeps ---
    // Fail jobs a previous process instance left mid-download, then pick
    // up any still-pending queue entries.
    let recovered = importer.recover_orphaned_jobs().await?;
    if recovered > 0 {
        tracing::warn!(recovered, "Marked orphaned import jobs as failed");
    }
    importer.dispatch_pending().await;

    let expired = tokens.cleanup_expired_invitations().await?;
    if expired > 0 {
        tracing::info!(expired, "Swept expired invitations");
    }

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        bus,
        tokens,
        connector,
        importer,
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config
            .host
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid HOST address: {e}"))?,
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
