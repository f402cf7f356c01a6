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

/// Parameters for running an ad-hoc metric query.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct MetricQueryParams {
    /// Explore (table) to query.
    pub explore_name: String,
    /// JSON string of the metric query: dimensions, metrics, filters, sorts,
    /// `tableCalculations` and optionally `additionalMetrics`.
    pub metric_query: String,
    /// Row limit. Default: 500. Use 0 to keep the limit from the query itself.
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct DashboardChartParams {
    /// Dashboard whose filters apply (partial matches allowed).
    pub dashboard_name: String,
    /// Saved chart name or UUID.
    pub chart_identifier: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct DashboardTileRunParams {
    /// Dashboard name (partial matches allowed).
    pub dashboard_name: String,
    /// UUID of the tile to execute (see `get-dashboard-tiles`).
    pub tile_uuid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct DashboardTilesRunParams {
    /// Dashboard name (partial matches allowed).
    pub dashboard_name: String,
    /// Tile UUIDs to execute. Omit to run every chart tile.
    pub tile_uuids: Option<Vec<String>>,
}

#[tool_router(router = tool_router_queries, vis = "pub")]
impl LightdashMcp {
    #[tool(
        name = "run-metric-query",
        description = "Run a metric query against an explore and return the raw rows and field metadata as JSON."
    )]
    async fn run_metric_query(
        &self,
        Parameters(params): Parameters<MetricQueryParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let metric_query = helpers::parse_json_arg("metric_query", &params.metric_query)?;
        let rows = self
            .control()
            .run_metric_query(&params.explore_name, metric_query, params.limit)
            .await
            .map_err(helpers::map_err)?;
        helpers::json_result(rows)
    }

    #[tool(
        name = "run-raw-query",
        description = "Run a metric query against an explore and return the rows as CSV, preceded by a metadata line."
    )]
    async fn run_raw_query(
        &self,
        Parameters(params): Parameters<MetricQueryParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let metric_query = helpers::parse_json_arg("metric_query", &params.metric_query)?;
        let csv = self
            .control()
            .run_raw_query(&params.explore_name, metric_query, params.limit)
            .await
            .map_err(helpers::map_err)?;
        Ok(helpers::text_result(csv))
    }

    #[tool(
        name = "run-dashboard-chart",
        description = "Run a saved chart with a dashboard's filters applied and return the results as JSON."
    )]
    async fn run_dashboard_chart(
        &self,
        Parameters(params): Parameters<DashboardChartParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let results = self
            .control()
            .run_dashboard_chart(&params.dashboard_name, &params.chart_identifier)
            .await
            .map_err(helpers::map_err)?;
        helpers::json_result(results)
    }

    #[tool(
        name = "run-dashboard-tile",
        description = "Execute one chart tile in its dashboard context and return flattened rows as JSON."
    )]
    async fn run_dashboard_tile(
        &self,
        Parameters(params): Parameters<DashboardTileRunParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let rows = self
            .control()
            .run_dashboard_tile(&params.dashboard_name, &params.tile_uuid)
            .await
            .map_err(helpers::map_err)?;
        helpers::json_result(rows)
    }

    #[tool(
        name = "run-dashboard-tiles",
        description = "Execute several dashboard chart tiles concurrently. Each tile reports its own status with CSV data or an error, keyed by tile UUID."
    )]
    async fn run_dashboard_tiles(
        &self,
        Parameters(params): Parameters<DashboardTilesRunParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let report = self
            .control()
            .run_dashboard_tiles(&params.dashboard_name, params.tile_uuids.as_deref())
            .await
            .map_err(helpers::map_err)?;
        helpers::json_result(report)
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};
    use rmcp::model::ErrorCode;
    use serde_json::json;

    use super::*;
    use crate::test_support::{envelope, json_of, offline_server, server_for, text_of};

    #[tokio::test]
    async fn raw_query_renders_csv() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/projects/p1/explores/orders/runQuery")
            .match_body(Matcher::PartialJson(json!({"dimensions": ["orders_status"], "limit": 10})))
            .with_status(200)
            .with_body(envelope(json!({
                "rows": [
                    {"orders_status": {"value": {"raw": "shipped", "formatted": "Shipped"}}},
                    {"orders_status": {"value": {"raw": "open", "formatted": "Open"}}}
                ],
                "fields": {}
            })))
            .create_async()
            .await;
        let mcp = server_for(&server.url());

        let result = mcp
            .run_raw_query(Parameters(MetricQueryParams {
                explore_name: "orders".to_string(),
                metric_query: r#"{"dimensions": ["orders_status"], "metrics": []}"#.to_string(),
                limit: Some(10),
            }))
            .await
            .expect("query should run");

        mock.assert_async().await;
        assert_eq!(
            text_of(&result),
            "# Metadata: {\"row_count\":2,\"fields\":{}}\norders_status\nshipped\nopen\n"
        );
    }

    #[tokio::test]
    async fn metric_query_keeps_raw_cells() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/v1/projects/p1/explores/orders/runQuery")
            .with_status(200)
            .with_body(envelope(json!({
                "rows": [{"orders_count": {"value": {"raw": 3, "formatted": "3"}}}],
                "fields": {"orders_count": {"type": "count"}}
            })))
            .create_async()
            .await;
        let mcp = server_for(&server.url());

        let result = mcp
            .run_metric_query(Parameters(MetricQueryParams {
                explore_name: "orders".to_string(),
                metric_query: r#"{"metrics": ["orders_count"]}"#.to_string(),
                limit: None,
            }))
            .await
            .expect("query should run");

        let rows = json_of(&result);
        assert_eq!(rows["row_count"], 1);
        assert_eq!(rows["rows"][0]["orders_count"]["value"]["raw"], 3);
        assert_eq!(rows["fields"]["orders_count"]["type"], "count");
    }

    #[tokio::test]
    async fn metric_query_must_be_an_object() {
        let err = offline_server()
            .run_metric_query(Parameters(MetricQueryParams {
                explore_name: "orders".to_string(),
                metric_query: "[1, 2]".to_string(),
                limit: None,
            }))
            .await
            .expect_err("array is not a metric query");
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert_eq!(err.message, "metric_query must be a JSON object");
    }

    #[tokio::test]
    async fn tiles_run_reports_each_tile() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v1/projects/p1/dashboards")
            .with_status(200)
            .with_body(envelope(json!([{"uuid": "d1", "name": "Sales Overview"}])))
            .create_async()
            .await;
        server
            .mock("GET", "/api/v1/dashboards/d1")
            .with_status(200)
            .with_body(envelope(json!({
                "name": "Sales Overview",
                "tiles": [
                    {"uuid": "t1", "type": "saved_chart", "properties": {"savedChartUuid": "c1", "title": "Revenue"}},
                    {"uuid": "t2", "type": "markdown", "properties": {"title": "Notes"}}
                ],
                "tabs": [],
                "filters": {}
            })))
            .create_async()
            .await;
        server
            .mock("POST", "/api/v1/saved/c1/results")
            .match_query(Matcher::UrlEncoded("dashboardUuid".into(), "d1".into()))
            .with_status(200)
            .with_body(envelope(json!({"rows": [{"total": {"value": {"raw": 10}}}]})))
            .create_async()
            .await;
        let mcp = server_for(&server.url());

        let result = mcp
            .run_dashboard_tiles(Parameters(DashboardTilesRunParams {
                dashboard_name: "Sales".to_string(),
                tile_uuids: None,
            }))
            .await
            .expect("tiles should run");

        let report = json_of(&result);
        assert_eq!(
            report,
            json!({
                "results": {
                    "t1": {
                        "title": "Revenue",
                        "status": "success",
                        "csv_data": "# Metadata: {\"row_count\":1,\"fields\":{}}\ntotal\n10\n"
                    }
                }
            })
        );
    }

    #[tokio::test]
    async fn markdown_tile_cannot_run() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v1/projects/p1/dashboards")
            .with_status(200)
            .with_body(envelope(json!([{"uuid": "d1", "name": "Sales Overview"}])))
            .create_async()
            .await;
        server
            .mock("GET", "/api/v1/dashboards/d1")
            .with_status(200)
            .with_body(envelope(json!({
                "name": "Sales Overview",
                "tiles": [{"uuid": "t2", "type": "markdown", "properties": {"title": "Notes"}}],
                "tabs": [],
                "filters": {}
            })))
            .create_async()
            .await;
        let mcp = server_for(&server.url());

        let err = mcp
            .run_dashboard_tile(Parameters(DashboardTileRunParams {
                dashboard_name: "Sales".to_string(),
                tile_uuid: "t2".to_string(),
            }))
            .await
            .expect_err("markdown tiles are not charts");
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert_eq!(
            err.message,
            "Tile 't2' is of type 'markdown' and cannot be executed as a chart."
        );
    }
}
