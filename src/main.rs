//! Incident Relay server.
//!
//! # API Endpoints
//!
//! - `POST /report` - Submit an incident report (multipart form)
//! - `GET /ws` - WebSocket channel for status updates
//! - `GET /health` - Health check
//!
//! # Configuration
//!
//! - `RELAY_PORT` - Listen port (default 3001)
//! - `RELAY_TICK_INTERVAL_MS` - Delay between status updates (default 3000)
//! - `RELAY_MAX_UPLOAD_BYTES` - Report body limit (default 10 MiB)
//! - `RUST_LOG` - Log filter

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use incident_relay::api::{AppState, router};
use incident_relay::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("incident_relay=info".parse()?))
        .init();

    let config = Config::from_env();
    info!(
        port = config.port,
        tick_interval = ?config.tick_interval,
        max_upload_bytes = config.max_upload_bytes,
        "Starting Incident Relay"
    );

    let state = AppState::new(config.tick_interval);
    let dispatcher = state.dispatcher.clone();
    let app = router(state, config.max_upload_bytes);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "Incident Relay is listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    dispatcher.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
