use std::sync::Arc;

use tokio::signal;
use tracing::{error, info};

use roadgraph::driver::neo4j::Neo4jConnector;
use roadgraph::{GraphStore, RoadGraphConfig, StoreHandle};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Tracing ───────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("roadgraph=info".parse()?),
        )
        .json()
        .init();

    info!("roadgraph-server starting");

    // ── Config ────────────────────────────────────────────────────────────────
    let config = RoadGraphConfig::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        e
    })?;

    info!(
        write = %config.write_uri,
        read  = %config.read_uri,
        addr  = %config.bind_addr,
        "configuration loaded"
    );

    // ── Store ─────────────────────────────────────────────────────────────────
    let handle = Arc::new(StoreHandle::new(
        Neo4jConnector,
        config.read_endpoint(),
        config.write_endpoint(),
    ));
    handle.open().await.map_err(|e| {
        error!("Cannot open graph store: {}", e);
        e
    })?;

    let store = Arc::new(
        GraphStore::new(Arc::clone(&handle)).with_limits(config.proximity_limits()),
    );

    // ── Listen ────────────────────────────────────────────────────────────────
    let app = roadgraph::server::router(store);

    info!(addr = %config.bind_addr, "listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    handle.close();
    info!("server stopped");
    Ok(())
}

/// Graceful shutdown on SIGTERM or Ctrl-C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { info!("received Ctrl-C, shutting down"); }
        _ = terminate => { info!("received SIGTERM, shutting down"); }
    }
}
