use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::filters::merge_filters;
use crate::resolve::{find_chart, tile_title};
use crate::results::QueryRows;

use super::dashboards::{array_field, object_field};
use super::tiles::saved_chart_uuid;
use super::{ControlError, ControlResult, LightdashControl};

/// Row limit applied to explore queries when the caller does not give one.
pub const DEFAULT_QUERY_LIMIT: u64 = 500;

const UUID_LENGTH: usize = 36;

/// Per-tile outcome of a dashboard fan-out.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TileRunStatus {
    pub title: String,
    pub status: TileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csv_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TileStatus {
    Success,
    Error,
}

/// Result of `run-dashboard-tiles`, keyed by tile UUID in dashboard order.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TileRunReport {
    pub results: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LightdashControl {
    /// Runs a metric query against an explore and returns the raw rows.
    ///
    /// `limit` defaults to 500; `Some(0)` keeps the query's own limit.
    ///
    /// # Errors
    /// Returns `ControlError` if the project cannot be resolved or the query fails.
    pub async fn run_metric_query(
        &self,
        explore_name: &str,
        metric_query: Value,
        limit: Option<u64>,
    ) -> ControlResult<QueryRows> {
        let project = self.project_uuid(None).await?;
        self.run_explore_query(&project, explore_name, metric_query, limit)
            .await
    }

    /// Runs a metric query and renders the flattened rows as CSV.
    ///
    /// # Errors
    /// Returns `ControlError` if the project cannot be resolved or the query fails.
    pub async fn run_raw_query(
        &self,
        explore_name: &str,
        metric_query: Value,
        limit: Option<u64>,
    ) -> ControlResult<String> {
        let rows = self
            .run_metric_query(explore_name, metric_query, limit)
            .await?
            .flattened();
        Ok(rows.to_csv())
    }

    /// Runs a saved chart with a dashboard's filters applied.
    ///
    /// A 36-character identifier missing from the chart listing is treated as
    /// a UUID, which covers charts that only live on a dashboard.
    ///
    /// # Errors
    /// Returns `ControlError::NotFound` if the dashboard or chart cannot be resolved.
    pub async fn run_dashboard_chart(
        &self,
        dashboard_name: &str,
        chart_identifier: &str,
    ) -> ControlResult<Value> {
        let (dashboard_uuid, dashboard) = self.dashboard_by_name(dashboard_name).await?;
        let charts = self.list_charts(None).await?;
        let chart_uuid = match find_chart(&charts, chart_identifier) {
            Some(chart) => chart.uuid.clone(),
            None if chart_identifier.len() == UUID_LENGTH => chart_identifier.to_string(),
            None => {
                return Err(ControlError::NotFound(format!(
                    "Chart '{chart_identifier}' not found"
                )));
            }
        };
        self.run_saved_chart_in_dashboard(&chart_uuid, &dashboard_uuid, &object_field(&dashboard, "filters"))
            .await
    }

    /// Executes one dashboard tile with the dashboard's filters.
    ///
    /// # Errors
    /// Returns `ControlError::NotFound` if the tile is not on the dashboard, or
    /// `ControlError::InvalidInput` if it is not a chart tile.
    pub async fn run_dashboard_tile(
        &self,
        dashboard_name: &str,
        tile_uuid: &str,
    ) -> ControlResult<QueryRows> {
        let (dashboard_uuid, dashboard) = self.dashboard_by_name(dashboard_name).await?;
        let filters = object_field(&dashboard, "filters");
        let tile = array_field(&dashboard, "tiles")
            .into_iter()
            .find(|tile| tile.get("uuid").and_then(Value::as_str) == Some(tile_uuid))
            .ok_or_else(|| {
                ControlError::NotFound(format!(
                    "Tile '{tile_uuid}' not found on dashboard '{dashboard_name}'"
                ))
            })?;
        self.execute_tile(&tile, &filters, &dashboard_uuid).await
    }

    /// Executes several dashboard tiles concurrently.
    ///
    /// Without `tile_uuids` every `saved_chart` and `chart` tile runs. At most
    /// `tile_concurrency` queries are in flight; a failing tile is recorded in
    /// its own entry and never stops the others.
    ///
    /// # Errors
    /// Returns `ControlError` only if the dashboard itself cannot be resolved or fetched.
    pub async fn run_dashboard_tiles(
        &self,
        dashboard_name: &str,
        tile_uuids: Option<&[String]>,
    ) -> ControlResult<TileRunReport> {
        let (dashboard_uuid, dashboard) = self.dashboard_by_name(dashboard_name).await?;
        let filters = object_field(&dashboard, "filters");

        let wanted = tile_uuids.filter(|uuids| !uuids.is_empty());
        let selected: Vec<(String, Value)> = array_field(&dashboard, "tiles")
            .into_iter()
            .enumerate()
            .filter(|(_, tile)| {
                wanted.map_or_else(
                    || {
                        matches!(
                            tile.get("type").and_then(Value::as_str),
                            Some("saved_chart" | "chart")
                        )
                    },
                    |uuids| {
                        tile.get("uuid")
                            .and_then(Value::as_str)
                            .is_some_and(|uuid| uuids.iter().any(|id| id == uuid))
                    },
                )
            })
            .map(|(index, tile)| (tile_key(&tile, index), tile))
            .collect();

        if selected.is_empty() {
            return Ok(TileRunReport {
                results: Map::new(),
                message: Some("No matching chart tiles found to execute.".to_string()),
            });
        }

        info!(
            dashboard = %dashboard_name,
            tiles = selected.len(),
            concurrency = self.tile_concurrency,
            "running dashboard tiles"
        );

        let filters = &filters;
        let dashboard_uuid = dashboard_uuid.as_str();
        let outcomes: Vec<(String, TileRunStatus)> = stream::iter(selected)
            .map(|(key, tile)| async move {
                let title = Some(tile_title(&tile))
                    .filter(|title| !title.is_empty())
                    .unwrap_or_else(|| "Untitled".to_string());
                let status = match self.execute_tile(&tile, filters, dashboard_uuid).await {
                    Ok(rows) => TileRunStatus {
                        title,
                        status: TileStatus::Success,
                        csv_data: Some(rows.to_csv()),
                        error: None,
                    },
                    Err(err) => {
                        warn!(tile = %key, error = %err, "dashboard tile failed");
                        TileRunStatus {
                            title,
                            status: TileStatus::Error,
                            csv_data: None,
                            error: Some(err.to_string()),
                        }
                    }
                };
                (key, status)
            })
            .buffered(self.tile_concurrency)
            .collect()
            .await;

        let mut results = Map::new();
        for (key, status) in outcomes {
            results.insert(key, serde_json::to_value(status)?);
        }
        Ok(TileRunReport {
            results,
            message: None,
        })
    }

    /// Runs a single tile: saved charts through the results endpoint with the
    /// dashboard context, dashboard-only charts as an explore query with the
    /// dashboard filters merged in. Rows come back flattened.
    async fn execute_tile(
        &self,
        tile: &Value,
        dashboard_filters: &Value,
        dashboard_uuid: &str,
    ) -> ControlResult<QueryRows> {
        let tile_uuid = tile.get("uuid").and_then(Value::as_str).unwrap_or_default();
        match tile.get("type").and_then(Value::as_str) {
            Some("saved_chart") => {
                let chart_uuid = saved_chart_uuid(tile).ok_or_else(|| {
                    ControlError::InvalidInput(format!("Saved chart tile {tile_uuid} missing UUID"))
                })?;
                let results = self
                    .run_saved_chart_in_dashboard(&chart_uuid, dashboard_uuid, dashboard_filters)
                    .await?;
                Ok(QueryRows::from_results(results).flattened())
            }
            Some("chart") => {
                let (explore_name, mut metric_query) = inline_chart_query(tile).ok_or_else(|| {
                    ControlError::InvalidInput(format!(
                        "Could not find metric query for tile '{tile_uuid}'"
                    ))
                })?;
                let chart_filters = metric_query.get("filters").cloned().unwrap_or(Value::Null);
                metric_query["filters"] = merge_filters(&chart_filters, dashboard_filters);
                let project = self.project_uuid(None).await?;
                let rows = self
                    .run_explore_query(&project, &explore_name, metric_query, None)
                    .await?;
                Ok(rows.flattened())
            }
            other => Err(ControlError::InvalidInput(format!(
                "Tile '{tile_uuid}' is of type '{}' and cannot be executed as a chart.",
                other.unwrap_or("unknown")
            ))),
        }
    }

    async fn run_saved_chart_in_dashboard(
        &self,
        chart_uuid: &str,
        dashboard_uuid: &str,
        dashboard_filters: &Value,
    ) -> ControlResult<Value> {
        Ok(self
            .client
            .post_with_query(
                &["saved", chart_uuid, "results"],
                &[("dashboardUuid", dashboard_uuid)],
                &json!({ "filters": dashboard_filters }),
            )
            .await?)
    }

    async fn run_explore_query(
        &self,
        project: &str,
        explore_name: &str,
        mut metric_query: Value,
        limit: Option<u64>,
    ) -> ControlResult<QueryRows> {
        if !metric_query.is_object() {
            return Err(ControlError::InvalidInput(
                "metric_query must be a JSON object".to_string(),
            ));
        }
        let limit = limit.unwrap_or(DEFAULT_QUERY_LIMIT);
        if limit > 0 {
            metric_query["limit"] = json!(limit);
        }
        let results = self
            .client
            .post(
                &["projects", project, "explores", explore_name, "runQuery"],
                &metric_query,
            )
            .await?;
        Ok(QueryRows::from_results(results))
    }
}

/// Report key for a tile: its UUID, or `tile-{index}` for tiles stored without one.
fn tile_key(tile: &Value, index: usize) -> String {
    tile.get("uuid")
        .and_then(Value::as_str)
        .filter(|uuid| !uuid.is_empty())
        .map_or_else(|| format!("tile-{index}"), ToString::to_string)
}

/// Explore name and metric query of a dashboard-only chart tile, read from
/// `belongsToChart` when present and from the tile properties otherwise.
fn inline_chart_query(tile: &Value) -> Option<(String, Value)> {
    let source = tile.get("belongsToChart").or_else(|| tile.get("properties"))?;
    let metric_query = source.get("metricQuery").filter(|query| query.is_object())?;
    let explore_name = source
        .get("tableName")
        .or_else(|| metric_query.get("exploreName"))
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())?;
    Some((explore_name.to_string(), metric_query.clone()))
}
