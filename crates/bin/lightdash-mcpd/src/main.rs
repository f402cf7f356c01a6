//! Daemon entry point for the Lightdash MCP server.
//!
//! Loads configuration from CLI arguments and the environment, builds the
//! Lightdash control plane, and serves the MCP protocol over stdio and/or
//! streamable HTTP.

mod config;
mod logging;

use std::sync::Arc;

use lightdash_core::client::LightdashClient;
use lightdash_core::control::LightdashControl;
use lightdash_mcp::server::{McpHttpServerConfig, serve_stdio, serve_streamable_http};
use tracing::info;

use crate::config::LightdashConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = LightdashConfig::from_args()?;
    logging::init(config.log_level, config.log_json)?;

    let client = LightdashClient::new(&config.client_config())?;
    let control = Arc::new(
        LightdashControl::new(client)
            .with_default_project(config.project_uuid.clone())
            .with_tile_concurrency(config.tile_concurrency),
    );
    info!(
        url = %config.base_url,
        project = config.project_uuid.as_deref().unwrap_or("<first in organization>"),
        stdio = config.enable_stdio,
        http = config.enable_http,
        "starting lightdash-mcpd"
    );

    let http = config.enable_http.then(|| {
        tokio::spawn(serve_streamable_http(
            control.clone(),
            McpHttpServerConfig::new(config.http_addr),
        ))
    });

    // The stdio session owns the process lifetime when enabled.
    if config.enable_stdio {
        let result = serve_stdio(control).await;
        if let Some(handle) = &http {
            handle.abort();
        }
        return result;
    }
    if let Some(handle) = http {
        handle.await??;
    }
    Ok(())
}
