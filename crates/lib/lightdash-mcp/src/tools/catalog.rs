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

/// Parameters for tools scoped to a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ProjectParams {
    /// Project UUID. Defaults to the configured project, else the first project in the organization.
    pub project_uuid: Option<String>,
}

/// Parameters for summarizing an explore.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ExploreSchemaParams {
    /// Name of the explore/table (see `list-explores`).
    pub table_name: String,
    /// Include fields marked hidden. Default: false.
    pub include_hidden: Option<bool>,
}

#[tool_router(router = tool_router_catalog, vis = "pub")]
impl LightdashMcp {
    #[tool(name = "list-projects", description = "List all projects in the Lightdash organization.")]
    async fn list_projects(&self) -> Result<CallToolResult, ErrorData> {
        let projects = self
            .control()
            .list_projects()
            .await
            .map_err(helpers::map_err)?;
        helpers::json_result(projects)
    }

    #[tool(name = "get-project", description = "Get detailed information about a project.")]
    async fn get_project(
        &self,
        Parameters(params): Parameters<ProjectParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let project = self
            .control()
            .get_project(params.project_uuid.as_deref())
            .await
            .map_err(helpers::map_err)?;
        helpers::json_result(project)
    }

    #[tool(
        name = "list-explores",
        description = "List the explores (queryable tables) in a project with their label, description and type."
    )]
    async fn list_explores(
        &self,
        Parameters(params): Parameters<ProjectParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let listing = self
            .control()
            .list_explores(params.project_uuid.as_deref())
            .await
            .map_err(helpers::map_err)?;
        helpers::json_result(listing)
    }

    #[tool(name = "get-catalog", description = "Get the raw data catalog of a project.")]
    async fn get_catalog(
        &self,
        Parameters(params): Parameters<ProjectParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let catalog = self
            .control()
            .get_catalog(params.project_uuid.as_deref())
            .await
            .map_err(helpers::map_err)?;
        helpers::json_result(catalog)
    }

    #[tool(name = "get-metrics-catalog", description = "Get the metrics catalog of a project.")]
    async fn get_metrics_catalog(
        &self,
        Parameters(params): Parameters<ProjectParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let metrics = self
            .control()
            .get_metrics_catalog(params.project_uuid.as_deref())
            .await
            .map_err(helpers::map_err)?;
        helpers::json_result(metrics)
    }

    #[tool(
        name = "get-custom-metrics",
        description = "Get the custom metrics defined in a project."
    )]
    async fn get_custom_metrics(
        &self,
        Parameters(params): Parameters<ProjectParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let metrics = self
            .control()
            .get_custom_metrics(params.project_uuid.as_deref())
            .await
            .map_err(helpers::map_err)?;
        helpers::json_result(metrics)
    }

    #[tool(
        name = "get-explore-schema",
        description = "Summarize an explore: its tables, dimensions, metrics (with SQL) and joins. Field ids are `{table}_{field}` and are what metric queries and chart configs reference."
    )]
    async fn get_explore_schema(
        &self,
        Parameters(params): Parameters<ExploreSchemaParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let schema = self
            .control()
            .get_explore_schema(&params.table_name, params.include_hidden.unwrap_or(false))
            .await
            .map_err(helpers::map_err)?;
        helpers::json_result(schema)
    }
}
