//! MCP server implementation for lightdash-mcp.
//!
//! This crate wires the Lightdash control plane into rmcp tool handlers. Each
//! domain module contributes one tool router; they are summed into a single
//! static tool table when the server is built.

mod helpers;
mod tools;
pub mod server;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use lightdash_core::control::LightdashControl;
use rmcp::{
    ErrorData,
    ServerHandler,
    handler::server::tool::ToolRouter,
    tool,
    tool_handler,
    tool_router,
};
use rmcp::model::{CallToolResult, ServerCapabilities, ServerInfo, Tool};

const SERVER_INSTRUCTIONS: &str = r"lightdash-mcp exposes a Lightdash instance (projects, explores, charts, dashboards, tiles and spaces) as MCP tools.

Workflow:
1. Discover data: `list-projects`, `list-explores`, `get-explore-schema` (field ids are `{table}_{field}`),
   `get-catalog`, `get-metrics-catalog`, `get-custom-metrics`.
2. Query data: `run-metric-query` (raw rows) or `run-raw-query` (CSV). `run-chart-query` runs a saved chart.
3. Charts: `list-charts`, `search-charts`, `get-chart-details`, `create-chart`, `update-chart`, `delete-chart`.
   Read `chart-config-help` before building a chart config.
4. Dashboards: `list-dashboards`, `get-dashboard-code`, `create-dashboard`, `duplicate-dashboard`,
   `update-dashboard-filters`, and the tile tools (`get-dashboard-tiles`, `get-dashboard-tile-chart-config`,
   `create-dashboard-tile`, `update-dashboard-tile`, `rename-dashboard-tile`, `delete-dashboard-tile`).
5. Dashboard data: `run-dashboard-chart`, `run-dashboard-tile`, `run-dashboard-tiles`.
6. Spaces: `list-spaces`, `create-space`, `delete-space`.

Notes:
- Dashboards are matched by name (exact first, then partial). Charts by UUID or exact name. Tiles by partial title.
- JSON-valued arguments (`metric_query`, `chart_config`, `filters`, `tiles`, ...) are passed as JSON strings.
- When `project_uuid` is omitted the configured default project is used, else the first project in the organization.
- `help` lists every tool; `health` returns `ok`.";

/// MCP server wrapper around the Lightdash control plane and tool routers.
#[derive(Clone)]
pub struct LightdashMcp {
    tool_router: ToolRouter<Self>,
    control: Arc<LightdashControl>,
}

impl LightdashMcp {
    /// Creates a new server owning the control plane.
    #[must_use]
    pub fn new(control: LightdashControl) -> Self {
        Self::with_control(Arc::new(control))
    }

    /// Creates a new server using a shared control plane handle.
    #[must_use]
    pub fn with_control(control: Arc<LightdashControl>) -> Self {
        let tool_router = Self::tool_router_core()
            + Self::tool_router_catalog()
            + Self::tool_router_charts()
            + Self::tool_router_dashboards()
            + Self::tool_router_tiles()
            + Self::tool_router_queries()
            + Self::tool_router_spaces()
            + Self::tool_router_context();
        Self {
            tool_router,
            control,
        }
    }

    /// Every registered tool, in registration order.
    #[must_use]
    pub fn tools(&self) -> Vec<Tool> {
        self.tool_router.list_all()
    }

    pub(crate) fn control(&self) -> &LightdashControl {
        &self.control
    }
}

#[tool_router(router = tool_router_core, vis = "pub")]
impl LightdashMcp {
    #[tool(description = "Health check. Returns 'ok'.")]
    async fn health(&self) -> Result<CallToolResult, ErrorData> {
        Ok(helpers::text_result("ok"))
    }
}

#[tool_handler]
impl ServerHandler for LightdashMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
