use lightdash_core::control::{CreateChartRequest, UpdateChartRequest};
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

/// Parameters for listing saved charts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ListChartsParams {
    /// Optional case-insensitive filter on chart names.
    pub search_term: Option<String>,
}

/// Parameters for searching charts by name or description.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SearchChartsParams {
    /// Text to look for in chart names and descriptions.
    pub search_term: String,
}

/// Parameters for tools that address one saved chart.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ChartIdentifierParams {
    /// Chart UUID or exact chart name.
    pub chart_identifier: String,
}

/// Parameters for creating a saved chart.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CreateChartParams {
    /// Name of the chart.
    pub name: String,
    /// Explore/table the chart queries (see `get-explore-schema`).
    pub table_name: String,
    /// Space to save the chart in (see `list-spaces`).
    pub space_uuid: String,
    /// JSON string of the metric query.
    pub metric_query: String,
    /// JSON string of the chart configuration (see `chart-config-help`).
    pub chart_config: String,
    /// Optional JSON string of the pivot configuration, e.g. `{"columns": ["table_dimension"]}`.
    pub pivot_config: Option<String>,
    /// Optional chart description.
    pub description: Option<String>,
}

/// Parameters for saving a new version of a chart.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct UpdateChartParams {
    /// Chart UUID or exact chart name.
    pub chart_identifier: String,
    /// New chart name.
    pub name: Option<String>,
    /// New chart description.
    pub description: Option<String>,
    /// JSON string of `metricQuery` fields to merge in (sorts, filters, dimensions, metrics, ...).
    pub metric_query: Option<String>,
    /// JSON string of `chartConfig` fields to merge in.
    pub chart_config: Option<String>,
    /// JSON string replacing the pivotConfig. Use `null` to remove the pivot.
    pub pivot_config: Option<String>,
}

/// Parameters for running a saved chart.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RunChartQueryParams {
    /// UUID of the saved chart.
    pub chart_uuid: String,
    /// Maximum number of rows to return.
    pub limit: Option<usize>,
}

#[tool_router(router = tool_router_charts, vis = "pub")]
impl LightdashMcp {
    #[tool(
        name = "list-charts",
        description = "List saved charts in the project, optionally filtered by name."
    )]
    async fn list_charts(
        &self,
        Parameters(params): Parameters<ListChartsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let charts = self
            .control()
            .list_charts(params.search_term.as_deref())
            .await
            .map_err(helpers::map_err)?;
        helpers::json_result(charts)
    }

    #[tool(
        name = "search-charts",
        description = "Search saved charts whose name or description contains the search term."
    )]
    async fn search_charts(
        &self,
        Parameters(params): Parameters<SearchChartsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let charts = self
            .control()
            .search_charts(&params.search_term)
            .await
            .map_err(helpers::map_err)?;
        helpers::json_result(charts)
    }

    #[tool(
        name = "get-chart-details",
        description = "Get the full definition of a saved chart: metric query, chart config, table config and pivot."
    )]
    async fn get_chart_details(
        &self,
        Parameters(params): Parameters<ChartIdentifierParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let chart = self
            .control()
            .get_chart_details(&params.chart_identifier)
            .await
            .map_err(helpers::map_err)?;
        helpers::json_result(chart)
    }

    #[tool(
        name = "create-chart",
        description = "Create a saved chart in a space. The chart config is validated against the metric query before saving: every series needs `encode`, and `encode.xRef`/`encode.yRef` must be objects whose `field` is a dimension, metric, additional metric (`{table}_{name}`) or custom dimension of the query. Call `chart-config-help` for complete examples."
    )]
    async fn create_chart(
        &self,
        Parameters(params): Parameters<CreateChartParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let metric_query = helpers::parse_json_arg("metric_query", &params.metric_query)?;
        let chart_config = helpers::parse_json_arg("chart_config", &params.chart_config)?;
        let pivot_config =
            helpers::parse_optional_json_arg("pivot_config", params.pivot_config.as_deref())?;
        let pivoted = pivot_config.as_ref().is_some_and(|pivot| !pivot.is_null());

        let created = self
            .control()
            .create_chart(CreateChartRequest {
                name: params.name.clone(),
                table_name: params.table_name,
                space_uuid: params.space_uuid,
                metric_query,
                chart_config,
                pivot_config,
                description: params.description,
            })
            .await
            .map_err(helpers::map_err)?;

        let mut message = format!(
            "Successfully created chart '{}' with UUID: {}\n\nColumns in table view: {:?}",
            params.name, created.uuid, created.column_order
        );
        if pivoted {
            message.push_str("\nPivot configuration applied.");
        }
        Ok(helpers::text_result(message))
    }

    #[tool(
        name = "update-chart",
        description = "Save a new version of a chart. `metric_query` and `chart_config` are merged into the current definition (objects merge key by key, other values replace); `pivot_config` replaces the pivot and `null` removes it."
    )]
    async fn update_chart(
        &self,
        Parameters(params): Parameters<UpdateChartParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let request = UpdateChartRequest {
            metric_query: helpers::parse_optional_json_arg(
                "metric_query",
                params.metric_query.as_deref(),
            )?,
            chart_config: helpers::parse_optional_json_arg(
                "chart_config",
                params.chart_config.as_deref(),
            )?,
            pivot_config: helpers::parse_optional_json_arg(
                "pivot_config",
                params.pivot_config.as_deref(),
            )?,
            chart_identifier: params.chart_identifier,
            name: params.name,
            description: params.description,
        };

        let update = self
            .control()
            .update_chart(request)
            .await
            .map_err(helpers::map_err)?;
        if update.updated_fields.is_empty() {
            return Ok(helpers::text_result(
                "No updates provided. Specify at least one field to update (name, description, metric_query, chart_config, or pivot_config).",
            ));
        }
        Ok(helpers::text_result(format!(
            "Successfully updated chart '{}' (UUID: {})\n\nUpdated fields: {}",
            update.name,
            update.uuid,
            update.updated_fields.join(", ")
        )))
    }

    #[tool(
        name = "delete-chart",
        description = "Delete a saved chart by UUID or exact name. This cannot be undone."
    )]
    async fn delete_chart(
        &self,
        Parameters(params): Parameters<ChartIdentifierParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let chart = self
            .control()
            .delete_chart(&params.chart_identifier)
            .await
            .map_err(helpers::map_err)?;
        Ok(helpers::text_result(format!(
            "Successfully deleted chart '{}'",
            chart.name
        )))
    }

    #[tool(
        name = "run-chart-query",
        description = "Run a saved chart's query and return the rows as CSV, preceded by a metadata line."
    )]
    async fn run_chart_query(
        &self,
        Parameters(params): Parameters<RunChartQueryParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let csv = self
            .control()
            .run_chart_query(&params.chart_uuid, params.limit)
            .await
            .map_err(helpers::map_err)?;
        Ok(helpers::text_result(csv))
    }
}
