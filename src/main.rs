use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::io::{self, BufReader};
use tracing::info;

use openapi_mcp_server::{transport, Config, McpServer};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let config = Config::parse();

    // Initialize tracing (only if not quiet). stdout carries the protocol in stdio mode.
    if !config.quiet {
        tracing_subscriber::fmt()
            .with_env_filter(config.log_level.as_str())
            .with_writer(std::io::stderr)
            .init();
    }

    config.validate()?;

    info!("Starting OpenAPI MCP Server v{}", env!("CARGO_PKG_VERSION"));

    let server = Arc::new(McpServer::from_config(&config).await?);
    info!("MCP Server '{}' initialized successfully", server.server_name());

    if config.stdio {
        transport::run_stdio(server, BufReader::new(io::stdin()), io::stdout()).await?;
    } else {
        transport::run_http(server, config.socket_addr()?).await?;
    }

    Ok(())
}
