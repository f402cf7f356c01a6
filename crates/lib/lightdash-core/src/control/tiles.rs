use serde_json::{Map, Value, json};
use tracing::warn;
use uuid::Uuid;

use crate::resolve::{find_tile_index, tile_title, tile_titles};

use super::dashboards::array_field;
use super::{ControlError, ControlResult, LightdashControl};

const POSITION_KEYS: [&str; 4] = ["x", "y", "h", "w"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedTile {
    pub uuid: String,
    pub title: String,
}

impl LightdashControl {
    /// Summarizes every tile on a dashboard.
    ///
    /// # Errors
    /// Returns `ControlError` if the dashboard cannot be resolved or fetched.
    pub async fn get_dashboard_tiles(
        &self,
        dashboard_name: &str,
        include_full_config: bool,
    ) -> ControlResult<Vec<Value>> {
        let (_, dashboard) = self.dashboard_by_name(dashboard_name).await?;
        Ok(array_field(&dashboard, "tiles")
            .iter()
            .map(|tile| summarize_tile(tile, include_full_config))
            .collect())
    }

    /// Chart configuration behind one tile, classified by tile kind.
    ///
    /// A saved chart that cannot be fetched is reported in an `error` field
    /// rather than failing the call.
    ///
    /// # Errors
    /// Returns `ControlError::NotFound` if no tile title matches.
    pub async fn get_dashboard_tile_chart_config(
        &self,
        dashboard_name: &str,
        tile_identifier: &str,
    ) -> ControlResult<Value> {
        let (_, dashboard) = self.dashboard_by_name(dashboard_name).await?;
        let tiles = array_field(&dashboard, "tiles");
        let index = find_tile_index(&tiles, tile_identifier).ok_or_else(|| {
            ControlError::NotFound(format!(
                "Tile '{tile_identifier}' not found on dashboard. Available tiles: {:?}",
                tile_titles(&tiles)
            ))
        })?;
        let tile = &tiles[index];
        let properties = properties(tile);

        let mut result = json!({
            "tile_uuid": tile.get("uuid").cloned().unwrap_or(Value::Null),
            "tile_type": tile.get("type").cloned().unwrap_or(Value::Null),
            "title": tile_title(tile),
            "position": position(tile),
        });

        match tile.get("type").and_then(Value::as_str) {
            Some("saved_chart") => {
                if let Some(chart) = tile.get("belongsToChart") {
                    result["chart_type"] = json!("dashboard_only");
                    result["configuration"] = Value::Object(pick(
                        chart,
                        &[
                            "uuid",
                            "name",
                            "tableName",
                            "metricQuery",
                            "chartConfig",
                            "tableConfig",
                            "pivotConfig",
                            "updatedAt",
                            "updatedByUser",
                        ],
                    ));
                } else if let Some(chart_uuid) = saved_chart_uuid(tile) {
                    result["chart_type"] = json!("saved_chart_reference");
                    result["savedChartUuid"] = json!(chart_uuid);
                    match self.get_saved_chart(&chart_uuid).await {
                        Ok(chart) => {
                            result["configuration"] = Value::Object(pick(
                                &chart,
                                &[
                                    "uuid",
                                    "name",
                                    "tableName",
                                    "metricQuery",
                                    "chartConfig",
                                    "tableConfig",
                                    "pivotConfig",
                                    "spaceUuid",
                                    "updatedAt",
                                ],
                            ));
                        }
                        Err(err) => {
                            warn!(%chart_uuid, error = %err, "saved chart lookup failed");
                            result["error"] = json!(format!("Could not fetch saved chart: {err}"));
                        }
                    }
                }
            }
            Some("markdown") => {
                result["chart_type"] = json!("markdown");
                result["configuration"] = json!({
                    "content": text(&properties, "content"),
                    "title": text(&properties, "title"),
                });
            }
            Some("loom") => {
                result["chart_type"] = json!("loom");
                result["configuration"] = json!({
                    "url": text(&properties, "url"),
                    "title": text(&properties, "title"),
                });
            }
            Some("sql_chart") => {
                result["chart_type"] = json!("sql_chart");
                let mut configuration = json!({
                    "note": "SQL charts are not fully supported via API. Configuration details may be limited."
                });
                if let Some(raw) = tile.get("belongsToChart") {
                    configuration["raw_data"] = raw.clone();
                }
                result["configuration"] = configuration;
            }
            _ => {
                result["chart_type"] = json!("unknown");
                result["raw_properties"] = properties;
            }
        }
        Ok(result)
    }

    /// Adds a tile to a dashboard and returns the new tile's UUID.
    ///
    /// `properties` must carry `x`, `y`, `h` and `w`; those become tile-level
    /// fields and the rest stays in `properties`. Without `tab_uuid` the tile
    /// lands on the first tab, if the dashboard has tabs.
    ///
    /// # Errors
    /// Returns `ControlError::InvalidInput` if position keys are missing, or
    /// `ControlError` if the dashboard cannot be resolved or saved.
    pub async fn create_dashboard_tile(
        &self,
        dashboard_name: &str,
        tile_type: &str,
        properties: Value,
        tab_uuid: Option<&str>,
    ) -> ControlResult<String> {
        let Value::Object(mut properties) = properties else {
            return Err(ControlError::InvalidInput(
                "properties must be a JSON object".to_string(),
            ));
        };
        let missing: Vec<&str> = POSITION_KEYS
            .into_iter()
            .filter(|key| !properties.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            return Err(ControlError::InvalidInput(format!(
                "Missing required properties: {missing:?}. All tiles need x, y, h, w properties."
            )));
        }

        let (uuid, dashboard) = self.dashboard_by_name(dashboard_name).await?;
        let mut tiles = array_field(&dashboard, "tiles");

        let tile_uuid = Uuid::new_v4().to_string();
        let mut tile = Map::new();
        tile.insert("uuid".to_string(), json!(tile_uuid));
        for key in POSITION_KEYS {
            tile.insert(key.to_string(), properties.shift_remove(key).unwrap_or(Value::Null));
        }
        tile.insert("type".to_string(), json!(tile_type));
        tile.insert("properties".to_string(), Value::Object(properties));
        let tab = tab_uuid
            .filter(|tab| !tab.is_empty())
            .map(|tab| json!(tab))
            .or_else(|| {
                dashboard
                    .get("tabs")
                    .and_then(Value::as_array)
                    .and_then(|tabs| tabs.first())
                    .and_then(|tab| tab.get("uuid").cloned())
            })
            .unwrap_or(Value::Null);
        tile.insert("tabUuid".to_string(), tab);
        tiles.push(Value::Object(tile));

        self.save_dashboard(&uuid, &dashboard, tiles, None).await?;
        Ok(tile_uuid)
    }

    /// Applies property updates to the first tile whose title matches.
    /// Position keys are set on the tile, everything else in `properties`.
    ///
    /// # Errors
    /// Returns `ControlError::NotFound` if no tile matches, or
    /// `ControlError::InvalidInput` if the update is not an object.
    pub async fn update_dashboard_tile(
        &self,
        dashboard_name: &str,
        tile_identifier: &str,
        properties_update: Value,
    ) -> ControlResult<()> {
        let Value::Object(updates) = properties_update else {
            return Err(ControlError::InvalidInput(
                "properties_update must be a JSON object".to_string(),
            ));
        };
        let (uuid, dashboard) = self.dashboard_by_name(dashboard_name).await?;
        let mut tiles = array_field(&dashboard, "tiles");
        let index = matching_tile(&tiles, tile_identifier, dashboard_name)?;

        if let Some(tile) = tiles[index].as_object_mut() {
            for (key, value) in updates {
                if POSITION_KEYS.contains(&key.as_str()) {
                    tile.insert(key, value);
                } else {
                    with_properties(tile, |properties| properties.insert(key, value));
                }
            }
        }
        self.save_dashboard(&uuid, &dashboard, tiles, None).await
    }

    /// Renames a tile and returns its previous title.
    ///
    /// The new name goes to `title` when the tile already has one or has no
    /// chart name; otherwise the chart name is replaced.
    ///
    /// # Errors
    /// Returns `ControlError::NotFound` if no tile matches.
    pub async fn rename_dashboard_tile(
        &self,
        dashboard_name: &str,
        tile_identifier: &str,
        new_title: &str,
    ) -> ControlResult<String> {
        let (uuid, dashboard) = self.dashboard_by_name(dashboard_name).await?;
        let mut tiles = array_field(&dashboard, "tiles");
        let index = matching_tile(&tiles, tile_identifier, dashboard_name)?;
        let old_title = tile_title(&tiles[index]);

        if let Some(tile) = tiles[index].as_object_mut() {
            with_properties(tile, |properties| {
                let has_chart_name = properties
                    .get("chartName")
                    .and_then(Value::as_str)
                    .is_some_and(|name| !name.is_empty());
                let key = if properties.contains_key("title") || !has_chart_name {
                    "title"
                } else {
                    "chartName"
                };
                properties.insert(key.to_string(), json!(new_title))
            });
        }
        self.save_dashboard(&uuid, &dashboard, tiles, None).await?;
        Ok(old_title)
    }

    /// Removes the first tile whose title matches.
    ///
    /// # Errors
    /// Returns `ControlError::NotFound` if no tile matches.
    pub async fn delete_dashboard_tile(
        &self,
        dashboard_name: &str,
        tile_identifier: &str,
    ) -> ControlResult<DeletedTile> {
        let (uuid, dashboard) = self.dashboard_by_name(dashboard_name).await?;
        let mut tiles = array_field(&dashboard, "tiles");
        let index = matching_tile(&tiles, tile_identifier, dashboard_name)?;
        let removed = tiles.remove(index);

        self.save_dashboard(&uuid, &dashboard, tiles, None).await?;
        Ok(DeletedTile {
            uuid: removed
                .get("uuid")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            title: tile_title(&removed),
        })
    }
}

fn matching_tile(tiles: &[Value], tile_identifier: &str, dashboard_name: &str) -> ControlResult<usize> {
    find_tile_index(tiles, tile_identifier).ok_or_else(|| {
        ControlError::NotFound(format!(
            "Tile matching '{tile_identifier}' not found on dashboard '{dashboard_name}'"
        ))
    })
}

fn summarize_tile(tile: &Value, include_full_config: bool) -> Value {
    let mut summary = json!({
        "uuid": tile.get("uuid").cloned().unwrap_or(Value::Null),
        "type": tile.get("type").cloned().unwrap_or(Value::Null),
        "position": position(tile),
        "title": tile_title(tile),
    });
    let is_saved_chart = tile.get("type").and_then(Value::as_str) == Some("saved_chart");
    let chart_uuid = saved_chart_uuid(tile).filter(|_| is_saved_chart);
    if let Some(chart_uuid) = &chart_uuid {
        summary["savedChartUuid"] = json!(chart_uuid);
    }

    if include_full_config {
        if let Some(chart) = tile.get("belongsToChart") {
            let mut configuration = Map::new();
            configuration.insert("type".to_string(), json!("dashboard_only"));
            configuration.extend(pick(
                chart,
                &[
                    "uuid",
                    "name",
                    "tableName",
                    "metricQuery",
                    "chartConfig",
                    "tableConfig",
                    "pivotConfig",
                    "updatedAt",
                ],
            ));
            summary["chart_configuration"] = Value::Object(configuration);
        } else if let Some(chart_uuid) = chart_uuid {
            summary["chart_configuration"] = json!({
                "type": "saved_chart_reference",
                "savedChartUuid": chart_uuid,
            });
        }
    }
    summary
}

/// `properties.savedChartUuid`, else the legacy `properties.chartUuid`.
pub(crate) fn saved_chart_uuid(tile: &Value) -> Option<String> {
    let properties = tile.get("properties")?;
    ["savedChartUuid", "chartUuid"]
        .into_iter()
        .filter_map(|key| properties.get(key).and_then(Value::as_str))
        .find(|uuid| !uuid.is_empty())
        .map(str::to_string)
}

fn position(tile: &Value) -> Value {
    let field = |key: &str| tile.get(key).cloned().unwrap_or(Value::Null);
    json!({ "x": field("x"), "y": field("y"), "w": field("w"), "h": field("h") })
}

fn properties(tile: &Value) -> Value {
    tile.get("properties")
        .filter(|props| props.is_object())
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()))
}

/// Runs `apply` on the tile's `properties` object, creating it when absent
/// or not an object.
fn with_properties<R>(
    tile: &mut Map<String, Value>,
    apply: impl FnOnce(&mut Map<String, Value>) -> R,
) -> R {
    let slot = tile.entry("properties").or_insert(Value::Null);
    let mut properties = match std::mem::take(slot) {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    let result = apply(&mut properties);
    *slot = Value::Object(properties);
    result
}

fn pick(source: &Value, keys: &[&str]) -> Map<String, Value> {
    keys.iter()
        .map(|key| {
            (
                (*key).to_string(),
                source.get(*key).cloned().unwrap_or(Value::Null),
            )
        })
        .collect()
}

fn text(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_reports_saved_chart_reference() {
        let tile = json!({
            "uuid": "t1",
            "type": "saved_chart",
            "x": 0, "y": 2, "w": 18, "h": 6,
            "properties": {"chartUuid": "c1", "chartName": "Revenue", "title": ""}
        });

        let summary = summarize_tile(&tile, true);

        assert_eq!(summary["title"], "Revenue");
        assert_eq!(summary["savedChartUuid"], "c1");
        assert_eq!(summary["position"], json!({"x": 0, "y": 2, "w": 18, "h": 6}));
        assert_eq!(
            summary["chart_configuration"],
            json!({"type": "saved_chart_reference", "savedChartUuid": "c1"})
        );
    }

    #[test]
    fn summary_extracts_dashboard_only_chart() {
        let tile = json!({
            "uuid": "t2",
            "type": "chart",
            "properties": {"title": "Inline"},
            "belongsToChart": {"uuid": "c9", "tableName": "orders", "metricQuery": {"dimensions": []}}
        });

        let compact = summarize_tile(&tile, false);
        assert!(compact.get("chart_configuration").is_none());
        assert!(compact.get("savedChartUuid").is_none());

        let full = summarize_tile(&tile, true);
        assert_eq!(full["chart_configuration"]["type"], "dashboard_only");
        assert_eq!(full["chart_configuration"]["tableName"], "orders");
        assert!(full["chart_configuration"]["pivotConfig"].is_null());
    }

    #[test]
    fn with_properties_replaces_non_object_properties() {
        let mut tile = json!({"uuid": "t1", "properties": null});
        let map = tile.as_object_mut().expect("tile is an object");
        with_properties(map, |properties| properties.insert("title".to_string(), json!("x")));
        assert_eq!(tile["properties"], json!({"title": "x"}));
    }
}
