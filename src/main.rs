mod auth;
mod client;
mod config;
mod envelope;
mod error;
mod models;
mod request;
mod schema;
mod server;
mod tools;

use std::sync::Arc;

use anyhow::{Context, Result};
use client::BluumClient;
use config::{Config, TransportMode};
use server::McpServer;
use tools::Dispatcher;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bluum_mcp_server=info,tower_http=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting Bluum Finance MCP Server...");
    let config = Config::load()?;
    info!(
        environment = config.environment.as_str(),
        transport = config.transport.as_str(),
        "Configuration loaded successfully"
    );

    let client = BluumClient::from_config(&config).context("failed to build Bluum API client")?;
    let dispatcher = Dispatcher::new(Arc::new(client), config.default_account_id.clone());
    info!("{} tools registered", dispatcher.registry().len());

    let server = Arc::new(McpServer::new(dispatcher));
    match config.transport {
        TransportMode::Stdio => server::serve_stdio(server).await,
        TransportMode::Http => {
            let api_key = config
                .http_api_key
                .as_deref()
                .context("HTTP transport requires an API key")?;
            server::serve_http(server, config.bind_addr, api_key).await
        }
    }
}
