use lightdash_core::control::CreateDashboardRequest;
use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};

use crate::LightdashMcp;
use crate::helpers;
use crate::tools::catalog::ProjectParams;

/// Parameters for tools that address one dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct DashboardNameParams {
    /// Dashboard name. Exact matches win, otherwise the first partial match is used.
    pub dashboard_name: String,
}

/// Parameters for creating a dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CreateDashboardParams {
    /// Name of the dashboard (must be unique within the project).
    pub name: String,
    /// Optional description of the dashboard's purpose.
    pub description: Option<String>,
    /// Optional JSON array string of tiles. Each tile needs a type, properties and x/y/h/w.
    pub tiles: Option<String>,
    /// Optional JSON array string of tabs, e.g. [{"uuid": "tab-uuid", "name": "Overview", "order": 0}].
    pub tabs: Option<String>,
}

/// Parameters for copying a dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct DuplicateDashboardParams {
    /// Name of the dashboard to copy (partial matches allowed).
    pub source_dashboard_name: String,
    /// Name for the copy. Must be unique in the project.
    pub new_dashboard_name: String,
    /// Description for the copy. Defaults to the source description.
    pub new_description: Option<String>,
}

/// Parameters for replacing dashboard filters.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct UpdateDashboardFiltersParams {
    /// Dashboard name (partial matches allowed).
    pub dashboard_name: String,
    /// JSON string of the filter configuration, same structure as chart filters.
    pub filters: String,
}

#[tool_router(router = tool_router_dashboards, vis = "pub")]
impl LightdashMcp {
    #[tool(name = "list-dashboards", description = "List dashboards in a project.")]
    async fn list_dashboards(
        &self,
        Parameters(params): Parameters<ProjectParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let dashboards = self
            .control()
            .list_dashboards(params.project_uuid.as_deref())
            .await
            .map_err(helpers::map_err)?;
        helpers::json_result(dashboards)
    }

    #[tool(
        name = "create-dashboard",
        description = "Create a dashboard, either empty or pre-populated with tiles and tabs given as JSON array strings."
    )]
    async fn create_dashboard(
        &self,
        Parameters(params): Parameters<CreateDashboardParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let tiles = helpers::parse_json_array_arg("tiles", params.tiles.as_deref())?;
        let tabs = helpers::parse_json_array_arg("tabs", params.tabs.as_deref())?;
        let created = self
            .control()
            .create_dashboard(CreateDashboardRequest {
                name: params.name.clone(),
                description: params.description,
                tiles,
                tabs,
            })
            .await
            .map_err(helpers::map_err)?;
        Ok(helpers::text_result(format!(
            "Successfully created dashboard '{}' with UUID: {}. Dashboard has {} tiles and {} tabs.",
            params.name, created.uuid, created.tile_count, created.tab_count
        )))
    }

    #[tool(
        name = "duplicate-dashboard",
        description = "Copy a dashboard (tiles, tabs and filters) under a new name. Tiles and tabs get fresh UUIDs."
    )]
    async fn duplicate_dashboard(
        &self,
        Parameters(params): Parameters<DuplicateDashboardParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let uuid = self
            .control()
            .duplicate_dashboard(
                &params.source_dashboard_name,
                &params.new_dashboard_name,
                params.new_description.as_deref(),
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(helpers::text_result(format!(
            "Successfully duplicated dashboard '{}' to '{}' with UUID: {uuid}",
            params.source_dashboard_name, params.new_dashboard_name
        )))
    }

    #[tool(
        name = "get-dashboard-code",
        description = "Get the complete dashboard definition (tiles, tabs, filters) as JSON."
    )]
    async fn get_dashboard_code(
        &self,
        Parameters(params): Parameters<DashboardNameParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let dashboard = self
            .control()
            .get_dashboard_code(&params.dashboard_name)
            .await
            .map_err(helpers::map_err)?;
        helpers::json_result(dashboard)
    }

    #[tool(
        name = "update-dashboard-filters",
        description = "Replace the dashboard-level filters that apply to every tile."
    )]
    async fn update_dashboard_filters(
        &self,
        Parameters(params): Parameters<UpdateDashboardFiltersParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let filters = helpers::parse_json_arg("filters", &params.filters)?;
        self.control()
            .update_dashboard_filters(&params.dashboard_name, filters)
            .await
            .map_err(helpers::map_err)?;
        Ok(helpers::text_result(format!(
            "Successfully updated filters on dashboard '{}'",
            params.dashboard_name
        )))
    }
}
