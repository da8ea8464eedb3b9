//! Carcassonne multiplayer game server.

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod protocol;
mod room;
mod server;

use config::ServerConfig;
use server::ServerState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    info!(
        idle_timeout_secs = config.idle_timeout.as_secs(),
        eviction_interval_secs = config.eviction_interval.as_secs(),
        "Starting Carcassonne server..."
    );

    let state = Arc::new(ServerState::new(config.idle_timeout));

    tokio::spawn(server::run_eviction(
        Arc::clone(&state),
        config.eviction_interval,
    ));

    server::run_server(config.addr, state).await
}
