//! MCP server runners for lightdash-mcp.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use lightdash_core::control::LightdashControl;
use rmcp::serve_server;
use rmcp::transport::io::stdio;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig,
    StreamableHttpService,
    session::local::LocalSessionManager,
};
use tracing::info;

use crate::LightdashMcp;

pub const DEFAULT_HTTP_PORT: u16 = 4030;

/// Configuration for the MCP streamable HTTP server.
#[derive(Debug, Clone)]
pub struct McpHttpServerConfig {
    pub addr: SocketAddr,
    pub stateful_mode: bool,
    pub sse_keep_alive: Option<Duration>,
    pub sse_retry: Option<Duration>,
}

impl McpHttpServerConfig {
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            stateful_mode: true,
            sse_keep_alive: Some(Duration::from_secs(15)),
            sse_retry: Some(Duration::from_secs(3)),
        }
    }

    #[must_use]
    pub const fn with_stateful_mode(mut self, stateful_mode: bool) -> Self {
        self.stateful_mode = stateful_mode;
        self
    }

    #[must_use]
    pub const fn with_sse_keep_alive(mut self, sse_keep_alive: Option<Duration>) -> Self {
        self.sse_keep_alive = sse_keep_alive;
        self
    }
}

impl Default for McpHttpServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], DEFAULT_HTTP_PORT)))
    }
}

/// Serves the MCP server over stdio until the client disconnects.
///
/// # Errors
/// Returns any transport or server error.
pub async fn serve_stdio(
    control: Arc<LightdashControl>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let service = LightdashMcp::with_control(control);
    let (stdin, stdout) = stdio();
    info!("serving MCP over stdio");
    let running = serve_server(service, (stdin, stdout)).await?;
    let _ = running.waiting().await?;
    Ok(())
}

/// Serves the MCP server using streamable HTTP transport at `/mcp`, with a
/// plain `/health` endpoint alongside.
///
/// # Errors
/// Returns any listener or server error.
pub async fn serve_streamable_http(
    control: Arc<LightdashControl>,
    config: McpHttpServerConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let service: StreamableHttpService<LightdashMcp, LocalSessionManager> =
        StreamableHttpService::new(
            move || Ok(LightdashMcp::with_control(control.clone())),
            Arc::new(LocalSessionManager::default()),
            StreamableHttpServerConfig {
                sse_keep_alive: config.sse_keep_alive,
                sse_retry: config.sse_retry,
                stateful_mode: config.stateful_mode,
                ..Default::default()
            },
        );

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest_service("/mcp", service);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, "serving MCP over streamable HTTP");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_binds_loopback() {
        let config = McpHttpServerConfig::default();
        assert_eq!(config.addr.to_string(), "127.0.0.1:4030");
        assert!(config.stateful_mode);
        assert_eq!(config.sse_keep_alive, Some(Duration::from_secs(15)));
    }

    #[test]
    fn builders_override_session_settings() {
        let config = McpHttpServerConfig::default()
            .with_stateful_mode(false)
            .with_sse_keep_alive(None);
        assert!(!config.stateful_mode);
        assert!(config.sse_keep_alive.is_none());
    }
}
