use std::collections::HashMap;

use serde_json::{Map, Value, json};
use tracing::info;
use uuid::Uuid;

use crate::models::DashboardSummary;
use crate::resolve::find_dashboard;

use super::{ControlError, ControlResult, LightdashControl, decode_list, str_field};

/// Inputs for creating a dashboard.
#[derive(Debug, Clone, Default)]
pub struct CreateDashboardRequest {
    pub name: String,
    pub description: Option<String>,
    pub tiles: Vec<Value>,
    pub tabs: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedDashboard {
    pub uuid: String,
    pub tile_count: usize,
    pub tab_count: usize,
}

impl LightdashControl {
    /// Lists dashboards in a project.
    ///
    /// # Errors
    /// Returns `ControlError` if the project cannot be resolved or the listing fails.
    pub async fn list_dashboards(
        &self,
        project_uuid: Option<&str>,
    ) -> ControlResult<Vec<DashboardSummary>> {
        let project = self.project_uuid(project_uuid).await?;
        let results = self
            .client
            .get(&["projects", project.as_str(), "dashboards"])
            .await?;
        decode_list(results)
    }

    /// Resolves a dashboard name to its listing entry.
    ///
    /// # Errors
    /// Returns `ControlError::NotFound`, listing the available names, if nothing matches.
    pub async fn resolve_dashboard(&self, dashboard_name: &str) -> ControlResult<DashboardSummary> {
        let dashboards = self.list_dashboards(None).await?;
        if let Some(found) = find_dashboard(&dashboards, dashboard_name) {
            return Ok(found.clone());
        }
        let available: Vec<&str> = dashboards.iter().map(|d| d.name.as_str()).collect();
        Err(ControlError::NotFound(format!(
            "Dashboard '{dashboard_name}' not found. Available dashboards: {available:?}"
        )))
    }

    /// Fetches the full dashboard (tiles, tabs, filters) by UUID.
    ///
    /// # Errors
    /// Returns `ControlError` if the request fails.
    pub async fn get_dashboard(&self, dashboard_uuid: &str) -> ControlResult<Value> {
        Ok(self
            .client
            .get(&["dashboards", dashboard_uuid])
            .await?)
    }

    /// Resolves a dashboard by name and fetches it, returning its UUID too.
    ///
    /// # Errors
    /// Returns `ControlError` if the dashboard cannot be resolved or fetched.
    pub async fn dashboard_by_name(&self, dashboard_name: &str) -> ControlResult<(String, Value)> {
        let summary = self.resolve_dashboard(dashboard_name).await?;
        let dashboard = self.get_dashboard(&summary.uuid).await?;
        Ok((summary.uuid, dashboard))
    }

    /// Full dashboard JSON for inspection or reuse.
    ///
    /// # Errors
    /// Returns `ControlError` if the dashboard cannot be resolved or fetched.
    pub async fn get_dashboard_code(&self, dashboard_name: &str) -> ControlResult<Value> {
        Ok(self.dashboard_by_name(dashboard_name).await?.1)
    }

    /// Creates a dashboard, optionally pre-populated with tiles and tabs.
    ///
    /// # Errors
    /// Returns `ControlError` if the project cannot be resolved or the API rejects the dashboard.
    pub async fn create_dashboard(
        &self,
        request: CreateDashboardRequest,
    ) -> ControlResult<CreatedDashboard> {
        let tile_count = request.tiles.len();
        let tab_count = request.tabs.len();
        let payload = json!({
            "name": request.name,
            "description": request.description.unwrap_or_default(),
            "tiles": request.tiles,
            "tabs": request.tabs,
        });
        let uuid = self.post_dashboard(&payload).await?;
        Ok(CreatedDashboard {
            uuid,
            tile_count,
            tab_count,
        })
    }

    /// Copies a dashboard under a new name with fresh tile and tab UUIDs.
    ///
    /// # Errors
    /// Returns `ControlError` if the source cannot be resolved or the copy is rejected.
    pub async fn duplicate_dashboard(
        &self,
        source_dashboard_name: &str,
        new_dashboard_name: &str,
        new_description: Option<&str>,
    ) -> ControlResult<String> {
        let (_, source) = self.dashboard_by_name(source_dashboard_name).await?;
        let description = new_description
            .filter(|text| !text.is_empty())
            .map_or_else(|| str_field(&source, "description"), str::to_string);
        let (tiles, tabs) = regenerate_uuids(array_field(&source, "tiles"), array_field(&source, "tabs"));

        let payload = json!({
            "name": new_dashboard_name,
            "description": description,
            "tiles": tiles,
            "filters": object_field(&source, "filters"),
            "tabs": tabs,
        });
        self.post_dashboard(&payload).await
    }

    /// Replaces the dashboard-level filters.
    ///
    /// # Errors
    /// Returns `ControlError` if the dashboard cannot be resolved or saved.
    pub async fn update_dashboard_filters(
        &self,
        dashboard_name: &str,
        filters: Value,
    ) -> ControlResult<()> {
        let (uuid, dashboard) = self.dashboard_by_name(dashboard_name).await?;
        let tiles = array_field(&dashboard, "tiles");
        self.save_dashboard(&uuid, &dashboard, tiles, Some(filters)).await
    }

    /// Writes tiles (and optionally filters) back with `PATCH`, keeping the
    /// dashboard's name and tabs.
    pub(crate) async fn save_dashboard(
        &self,
        dashboard_uuid: &str,
        dashboard: &Value,
        tiles: Vec<Value>,
        filters: Option<Value>,
    ) -> ControlResult<()> {
        let payload = json!({
            "name": dashboard.get("name").cloned().unwrap_or(Value::Null),
            "tiles": tiles,
            "filters": filters.unwrap_or_else(|| object_field(dashboard, "filters")),
            "tabs": array_field(dashboard, "tabs"),
        });
        self.client
            .patch(&["dashboards", dashboard_uuid], &payload)
            .await?;
        info!(dashboard_uuid, "saved dashboard");
        Ok(())
    }

    async fn post_dashboard(&self, payload: &Value) -> ControlResult<String> {
        let project = self.project_uuid(None).await?;
        let created = self
            .client
            .post(&["projects", project.as_str(), "dashboards"], payload)
            .await?;
        let uuid = str_field(&created, "uuid");
        info!(dashboard_uuid = %uuid, "created dashboard");
        Ok(uuid)
    }
}

/// Gives every tile and tab a new v4 UUID and points tiles at their tab's new UUID.
fn regenerate_uuids(mut tiles: Vec<Value>, mut tabs: Vec<Value>) -> (Vec<Value>, Vec<Value>) {
    for tile in tiles.iter_mut().filter_map(Value::as_object_mut) {
        if tile.contains_key("uuid") {
            tile.insert("uuid".to_string(), Value::String(Uuid::new_v4().to_string()));
        }
    }

    let mut tab_map: HashMap<String, String> = HashMap::new();
    for tab in tabs.iter_mut().filter_map(Value::as_object_mut) {
        let Some(old) = tab.get("uuid").and_then(Value::as_str).map(str::to_string) else {
            continue;
        };
        let new = Uuid::new_v4().to_string();
        tab.insert("uuid".to_string(), Value::String(new.clone()));
        tab_map.insert(old, new);
    }

    for tile in tiles.iter_mut().filter_map(Value::as_object_mut) {
        let remapped = tile
            .get("tabUuid")
            .and_then(Value::as_str)
            .and_then(|old| tab_map.get(old))
            .cloned();
        if let Some(new) = remapped {
            tile.insert("tabUuid".to_string(), Value::String(new));
        }
    }
    (tiles, tabs)
}

pub(crate) fn array_field(value: &Value, key: &str) -> Vec<Value> {
    value
        .get(key)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

pub(crate) fn object_field(value: &Value, key: &str) -> Value {
    value
        .get(key)
        .filter(|field| !field.is_null())
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regenerated_tabs_keep_tile_membership() {
        let tiles = vec![
            json!({"uuid": "t1", "tabUuid": "tab-a", "type": "markdown"}),
            json!({"uuid": "t2", "tabUuid": "tab-b", "type": "saved_chart"}),
            json!({"type": "loom", "tabUuid": null}),
        ];
        let tabs = vec![json!({"uuid": "tab-a", "name": "One"}), json!({"uuid": "tab-b", "name": "Two"})];

        let (tiles, tabs) = regenerate_uuids(tiles, tabs);

        assert_ne!(tiles[0]["uuid"], "t1");
        assert!(Uuid::parse_str(tiles[0]["uuid"].as_str().unwrap_or_default()).is_ok());
        assert_eq!(tiles[0]["tabUuid"], tabs[0]["uuid"]);
        assert_eq!(tiles[1]["tabUuid"], tabs[1]["uuid"]);
        assert_ne!(tabs[0]["uuid"], "tab-a");
        assert!(tiles[2].get("uuid").is_none());
        assert!(tiles[2]["tabUuid"].is_null());
    }
}
