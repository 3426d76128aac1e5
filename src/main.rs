//! forum-hub server entry point.
//!
//! Starts the registry loop and the Axum HTTP server with the WebSocket
//! and dispatch endpoints, and tears both down on SIGINT/SIGTERM.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use forum_hub::api;
use forum_hub::app_state::AppState;
use forum_hub::auth::SessionLookup;
use forum_hub::config::ServerConfig;
use forum_hub::hub::{HubExit, HubHandle};
use forum_hub::persistence::{MemorySessionStore, PgSessionStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = ServerConfig::from_env().context("invalid configuration")?;
    tracing::info!(addr = %config.listen_addr, "starting forum-hub");

    // Session lookup
    let sessions: Arc<dyn SessionLookup> = if config.persistence_enabled {
        Arc::new(
            PgSessionStore::connect(&config)
                .await
                .context("connecting session store")?,
        )
    } else {
        tracing::warn!("persistence disabled; sessions are in-memory only");
        Arc::new(MemorySessionStore::new())
    };

    // Registry
    let (hub, mut hub_task) = HubHandle::spawn(config.hub_config());
    let app = api::build_app(AppState::new(hub.clone(), sessions, &config));

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    let signal_hub = hub.clone();
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("shutting down");
        signal_hub.shutdown().await;
    })
    .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => result?,
        exit = &mut hub_task => match exit {
            Ok(HubExit::Shutdown) => (&mut server).await?,
            Ok(exit) => anyhow::bail!("hub registry stopped unexpectedly: {exit:?}"),
            Err(err) => anyhow::bail!("hub registry crashed: {err}"),
        },
    }

    hub.shutdown().await;
    tracing::info!("clean shutdown complete");
    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
