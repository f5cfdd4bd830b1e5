//! Voxlead Web Server - voice contact intake.
//!
//! This binary:
//! - Issues voice session tokens to tenant owners
//! - Accepts captured contacts from the voice client
//! - Forwards them to each tenant's CRM webhook and logs the outcome

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use voxlead::{router, AppState, Config, PgStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        port = config.port,
        webhook_timeout_ms = config.webhook_timeout_ms,
        database_max_connections = config.database_max_connections,
        run_migrations = config.run_migrations,
        "config_loaded"
    );

    let store = PgStore::connect(
        config.database_url.expose(),
        config.database_max_connections,
    )
    .await
    .context("Failed to connect to database")?;

    if config.run_migrations {
        store
            .migrate()
            .await
            .context("Failed to apply database migrations")?;
    }

    let port = config.port;
    let state = AppState::new(config, Arc::new(store.clone()))
        .context("Failed to build webhook client")?;

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    store.close().await;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
