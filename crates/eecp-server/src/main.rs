use std::sync::Arc;

use anyhow::Result;
use axum::routing::get;
use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing::info;

mod admission;
mod cleanup;
mod config;
mod lifecycle;
mod rotation;
mod routing;
mod state;
mod ws;

use config::{CliArgs, ServerConfig};
use state::{AppState, WorkspaceRegistry};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = CliArgs::parse().apply(ServerConfig::from_env()?);
    info!(host = %cfg.host, port = cfg.port, "eecp-server starting");

    let registry = WorkspaceRegistry::new();
    cleanup::spawn(registry.clone(), cfg.cleanup_sweep_interval_secs);

    let state = AppState {
        registry,
        config: Arc::new(cfg.clone()),
    };

    let app = Router::new()
        .route("/ws", get(ws::handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind((cfg.host.as_str(), cfg.port)).await?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;

    Ok(())
}
