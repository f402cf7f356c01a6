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
pub struct CreateSpaceParams {
    /// Name of the new space.
    pub name: String,
    /// Restrict the space to its creator. Default: false.
    pub is_private: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SpaceIdentifierParams {
    /// Space UUID or exact name.
    pub space_identifier: String,
}

#[tool_router(router = tool_router_spaces, vis = "pub")]
impl LightdashMcp {
    #[tool(
        name = "list-spaces",
        description = "List spaces in the project with privacy and chart/dashboard counts."
    )]
    async fn list_spaces(&self) -> Result<CallToolResult, ErrorData> {
        let spaces = self
            .control()
            .list_spaces()
            .await
            .map_err(helpers::map_err)?;
        helpers::json_result(spaces)
    }

    #[tool(name = "create-space", description = "Create a space for organizing charts and dashboards.")]
    async fn create_space(
        &self,
        Parameters(params): Parameters<CreateSpaceParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let uuid = self
            .control()
            .create_space(&params.name, params.is_private.unwrap_or(false))
            .await
            .map_err(helpers::map_err)?;
        Ok(helpers::text_result(format!(
            "Successfully created space '{}' with UUID: {uuid}",
            params.name
        )))
    }

    #[tool(
        name = "delete-space",
        description = "Delete an empty space. Spaces that still hold charts or dashboards are rejected by Lightdash."
    )]
    async fn delete_space(
        &self,
        Parameters(params): Parameters<SpaceIdentifierParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let space = self
            .control()
            .delete_space(&params.space_identifier)
            .await
            .map_err(helpers::map_err)?;
        Ok(helpers::text_result(format!(
            "Successfully deleted space '{}'",
            space.name
        )))
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};
    use rmcp::model::ErrorCode;
    use serde_json::json;

    use super::*;
    use crate::test_support::{envelope, json_of, server_for, text_of};

    #[tokio::test]
    async fn spaces_report_content_counts() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v1/projects/p1/spaces")
            .with_status(200)
            .with_body(envelope(json!([{
                "uuid": "s1",
                "name": "Marketing",
                "isPrivate": true,
                "queries": [{"uuid": "c1"}, {"uuid": "c2"}],
                "dashboards": []
            }])))
            .create_async()
            .await;
        let mcp = server_for(&server.url());

        let result = mcp.list_spaces().await.expect("spaces should load");
        assert_eq!(
            json_of(&result),
            json!([{
                "uuid": "s1",
                "name": "Marketing",
                "isPrivate": true,
                "chartCount": 2,
                "dashboardCount": 0
            }])
        );
    }

    #[tokio::test]
    async fn create_space_defaults_to_public() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/projects/p1/spaces")
            .match_body(Matcher::Json(json!({"name": "Finance", "isPrivate": false})))
            .with_status(200)
            .with_body(envelope(json!({"uuid": "s9"})))
            .create_async()
            .await;
        let mcp = server_for(&server.url());

        let result = mcp
            .create_space(Parameters(CreateSpaceParams {
                name: "Finance".to_string(),
                is_private: None,
            }))
            .await
            .expect("space should be created");

        mock.assert_async().await;
        assert_eq!(
            text_of(&result),
            "Successfully created space 'Finance' with UUID: s9"
        );
    }

    #[tokio::test]
    async fn delete_unknown_space_is_not_found() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v1/projects/p1/spaces")
            .with_status(200)
            .with_body(envelope(json!([])))
            .create_async()
            .await;
        let mcp = server_for(&server.url());

        let err = mcp
            .delete_space(Parameters(SpaceIdentifierParams {
                space_identifier: "Archive".to_string(),
            }))
            .await
            .expect_err("no spaces exist");
        assert_eq!(err.code, ErrorCode::RESOURCE_NOT_FOUND);
        assert_eq!(err.message, "Space 'Archive' not found");
    }
}
