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

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct DashboardTilesParams {
    /// Dashboard name (partial matches allowed).
    pub dashboard_name: String,
    /// Include the chart configuration of each tile. Default: false.
    pub include_full_config: Option<bool>,
}

/// Parameters for tools that address a tile by title.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct TileParams {
    /// Dashboard name (partial matches allowed).
    pub dashboard_name: String,
    /// Tile title or chart name. The first tile whose title contains this text is used.
    pub tile_identifier: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CreateTileParams {
    /// Dashboard name (partial matches allowed).
    pub dashboard_name: String,
    /// Tile type: `saved_chart`, `markdown`, `loom` or `sql_chart`.
    pub tile_type: String,
    /// JSON object string. Must include `x`, `y`, `h` and `w`; other keys become tile properties
    /// (e.g. `savedChartUuid` for `saved_chart`, `content` for `markdown`).
    pub properties: String,
    /// Tab to place the tile on. Defaults to the dashboard's first tab.
    pub tab_uuid: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct UpdateTileParams {
    /// Dashboard name (partial matches allowed).
    pub dashboard_name: String,
    /// Tile title or chart name (partial match).
    pub tile_identifier: String,
    /// JSON object string of properties to set. x, y, h and w move the tile.
    pub properties_update: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RenameTileParams {
    /// Dashboard name (partial matches allowed).
    pub dashboard_name: String,
    /// Current tile title or chart name (partial match).
    pub tile_identifier: String,
    /// New title for the tile.
    pub new_title: String,
}

#[tool_router(router = tool_router_tiles, vis = "pub")]
impl LightdashMcp {
    #[tool(
        name = "get-dashboard-tiles",
        description = "List the tiles on a dashboard with type, title, position and chart reference."
    )]
    async fn get_dashboard_tiles(
        &self,
        Parameters(params): Parameters<DashboardTilesParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let tiles = self
            .control()
            .get_dashboard_tiles(
                &params.dashboard_name,
                params.include_full_config.unwrap_or(false),
            )
            .await
            .map_err(helpers::map_err)?;
        helpers::json_result(tiles)
    }

    #[tool(
        name = "get-dashboard-tile-chart-config",
        description = "Get the chart configuration behind a dashboard tile, whether it references a saved chart or holds a dashboard-only chart."
    )]
    async fn get_dashboard_tile_chart_config(
        &self,
        Parameters(params): Parameters<TileParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let config = self
            .control()
            .get_dashboard_tile_chart_config(&params.dashboard_name, &params.tile_identifier)
            .await
            .map_err(helpers::map_err)?;
        helpers::json_result(config)
    }

    #[tool(
        name = "create-dashboard-tile",
        description = "Add a tile (saved chart, markdown, loom video or SQL chart) to a dashboard."
    )]
    async fn create_dashboard_tile(
        &self,
        Parameters(params): Parameters<CreateTileParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let properties = helpers::parse_json_arg("properties", &params.properties)?;
        let tile_uuid = self
            .control()
            .create_dashboard_tile(
                &params.dashboard_name,
                &params.tile_type,
                properties,
                params.tab_uuid.as_deref(),
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(helpers::text_result(format!(
            "Successfully created new tile of type '{}' on dashboard '{}' with UUID: {tile_uuid}",
            params.tile_type, params.dashboard_name
        )))
    }

    #[tool(
        name = "update-dashboard-tile",
        description = "Update properties or position of a dashboard tile."
    )]
    async fn update_dashboard_tile(
        &self,
        Parameters(params): Parameters<UpdateTileParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let updates = helpers::parse_json_arg("properties_update", &params.properties_update)?;
        let rendered = updates.to_string();
        self.control()
            .update_dashboard_tile(&params.dashboard_name, &params.tile_identifier, updates)
            .await
            .map_err(helpers::map_err)?;
        Ok(helpers::text_result(format!(
            "Successfully updated tile '{}' on dashboard '{}' with properties: {rendered}",
            params.tile_identifier, params.dashboard_name
        )))
    }

    #[tool(name = "rename-dashboard-tile", description = "Change the title of a dashboard tile.")]
    async fn rename_dashboard_tile(
        &self,
        Parameters(params): Parameters<RenameTileParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let old_title = self
            .control()
            .rename_dashboard_tile(
                &params.dashboard_name,
                &params.tile_identifier,
                &params.new_title,
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(helpers::text_result(format!(
            "Successfully renamed tile from '{old_title}' to '{}' on dashboard '{}'",
            params.new_title, params.dashboard_name
        )))
    }

    #[tool(name = "delete-dashboard-tile", description = "Remove a tile from a dashboard.")]
    async fn delete_dashboard_tile(
        &self,
        Parameters(params): Parameters<TileParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let deleted = self
            .control()
            .delete_dashboard_tile(&params.dashboard_name, &params.tile_identifier)
            .await
            .map_err(helpers::map_err)?;
        Ok(helpers::text_result(format!(
            "Successfully deleted tile '{}' (UUID: {}) from dashboard '{}'",
            deleted.title, deleted.uuid, params.dashboard_name
        )))
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server, ServerGuard};
    use rmcp::model::ErrorCode;
    use serde_json::{Value, json};

    use super::*;
    use crate::test_support::{envelope, json_of, offline_server, server_for, text_of};

    fn tiles() -> Value {
        json!([
            {"uuid": "t1", "type": "saved_chart", "x": 0, "y": 0, "w": 12, "h": 6,
             "properties": {"savedChartUuid": "c1", "title": "Revenue"}},
            {"uuid": "t2", "type": "markdown", "x": 12, "y": 0, "w": 12, "h": 6,
             "properties": {"title": "Notes", "content": "hello"}}
        ])
    }

    async fn mock_dashboard(server: &mut ServerGuard) {
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
                "tiles": tiles(),
                "tabs": [],
                "filters": {}
            })))
            .create_async()
            .await;
    }

    #[tokio::test]
    async fn tiles_are_summarized() {
        let mut server = Server::new_async().await;
        mock_dashboard(&mut server).await;
        let mcp = server_for(&server.url());

        let result = mcp
            .get_dashboard_tiles(Parameters(DashboardTilesParams {
                dashboard_name: "Sales".to_string(),
                include_full_config: None,
            }))
            .await
            .expect("tiles should load");

        let summaries = json_of(&result);
        assert_eq!(summaries[0]["title"], "Revenue");
        assert_eq!(summaries[0]["savedChartUuid"], "c1");
        assert_eq!(summaries[1]["type"], "markdown");
        assert!(summaries[0].get("chart_configuration").is_none());
    }

    #[tokio::test]
    async fn markdown_tile_config_carries_content() {
        let mut server = Server::new_async().await;
        mock_dashboard(&mut server).await;
        let mcp = server_for(&server.url());

        let result = mcp
            .get_dashboard_tile_chart_config(Parameters(TileParams {
                dashboard_name: "Sales".to_string(),
                tile_identifier: "notes".to_string(),
            }))
            .await
            .expect("config should load");

        let config = json_of(&result);
        assert_eq!(config["chart_type"], "markdown");
        assert_eq!(config["configuration"]["content"], "hello");
    }

    #[tokio::test]
    async fn delete_tile_saves_remaining_tiles() {
        let mut server = Server::new_async().await;
        mock_dashboard(&mut server).await;
        let remaining = tiles()[1].clone();
        let patch = server
            .mock("PATCH", "/api/v1/dashboards/d1")
            .match_body(Matcher::PartialJson(json!({"tiles": [remaining]})))
            .with_status(200)
            .with_body(envelope(json!({})))
            .create_async()
            .await;
        let mcp = server_for(&server.url());

        let result = mcp
            .delete_dashboard_tile(Parameters(TileParams {
                dashboard_name: "Sales".to_string(),
                tile_identifier: "revenue".to_string(),
            }))
            .await
            .expect("tile should be deleted");

        patch.assert_async().await;
        assert_eq!(
            text_of(&result),
            "Successfully deleted tile 'Revenue' (UUID: t1) from dashboard 'Sales'"
        );
    }

    #[tokio::test]
    async fn rename_reports_old_title() {
        let mut server = Server::new_async().await;
        mock_dashboard(&mut server).await;
        server
            .mock("PATCH", "/api/v1/dashboards/d1")
            .with_status(200)
            .with_body(envelope(json!({})))
            .create_async()
            .await;
        let mcp = server_for(&server.url());

        let result = mcp
            .rename_dashboard_tile(Parameters(RenameTileParams {
                dashboard_name: "Sales".to_string(),
                tile_identifier: "Notes".to_string(),
                new_title: "Commentary".to_string(),
            }))
            .await
            .expect("tile should be renamed");

        assert_eq!(
            text_of(&result),
            "Successfully renamed tile from 'Notes' to 'Commentary' on dashboard 'Sales'"
        );
    }

    #[tokio::test]
    async fn update_moves_tile() {
        let mut server = Server::new_async().await;
        mock_dashboard(&mut server).await;
        let patch = server
            .mock("PATCH", "/api/v1/dashboards/d1")
            .match_body(Matcher::Regex(r#""uuid":"t2","type":"markdown","x":0,"y":6"#.to_string()))
            .with_status(200)
            .with_body(envelope(json!({})))
            .create_async()
            .await;
        let mcp = server_for(&server.url());

        let result = mcp
            .update_dashboard_tile(Parameters(UpdateTileParams {
                dashboard_name: "Sales".to_string(),
                tile_identifier: "Notes".to_string(),
                properties_update: r#"{"x": 0, "y": 6}"#.to_string(),
            }))
            .await
            .expect("tile should be updated");

        patch.assert_async().await;
        assert_eq!(
            text_of(&result),
            "Successfully updated tile 'Notes' on dashboard 'Sales' with properties: {\"x\":0,\"y\":6}"
        );
    }

    #[tokio::test]
    async fn unknown_tile_is_not_found() {
        let mut server = Server::new_async().await;
        mock_dashboard(&mut server).await;
        let mcp = server_for(&server.url());

        let err = mcp
            .delete_dashboard_tile(Parameters(TileParams {
                dashboard_name: "Sales".to_string(),
                tile_identifier: "Margin".to_string(),
            }))
            .await
            .expect_err("no tile matches");
        assert_eq!(err.code, ErrorCode::RESOURCE_NOT_FOUND);
        assert_eq!(
            err.message,
            "Tile matching 'Margin' not found on dashboard 'Sales'"
        );
    }

    #[tokio::test]
    async fn malformed_properties_are_rejected() {
        let err = offline_server()
            .create_dashboard_tile(Parameters(CreateTileParams {
                dashboard_name: "Sales".to_string(),
                tile_type: "markdown".to_string(),
                properties: "{x: 0".to_string(),
                tab_uuid: None,
            }))
            .await
            .expect_err("invalid JSON");
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert!(err.message.starts_with("Error parsing properties JSON"));
    }
}
