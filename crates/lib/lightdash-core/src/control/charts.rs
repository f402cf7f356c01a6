use serde_json::{Value, json};
use tracing::info;

use crate::chart_config::{
    build_table_config,
    deep_merge,
    sync_additional_metrics,
    validate_chart_config,
    version_payload,
};
use crate::models::ChartSummary;
use crate::resolve::find_chart;
use crate::results::{QueryRows, format_as_csv};

use super::{ControlError, ControlResult, LightdashControl, decode_list, str_field};

/// Inputs for creating a saved chart.
#[derive(Debug, Clone)]
pub struct CreateChartRequest {
    pub name: String,
    pub table_name: String,
    pub space_uuid: String,
    pub metric_query: Value,
    pub chart_config: Value,
    pub pivot_config: Option<Value>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedChart {
    pub uuid: String,
    pub column_order: Vec<String>,
}

/// Inputs for saving a new chart version. `pivot_config` set to JSON `null`
/// removes the pivot.
#[derive(Debug, Clone, Default)]
pub struct UpdateChartRequest {
    pub chart_identifier: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub metric_query: Option<Value>,
    pub chart_config: Option<Value>,
    pub pivot_config: Option<Value>,
}

/// Outcome of an update; `updated_fields` is empty when nothing was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartUpdate {
    pub uuid: String,
    pub name: String,
    pub updated_fields: Vec<String>,
}

impl LightdashControl {
    /// Lists saved charts, optionally keeping only names containing `search_term`.
    ///
    /// # Errors
    /// Returns `ControlError` if the project cannot be resolved or the listing fails.
    pub async fn list_charts(&self, search_term: Option<&str>) -> ControlResult<Vec<ChartSummary>> {
        let project = self.project_uuid(None).await?;
        let results = self
            .client
            .get(&["projects", project.as_str(), "charts"])
            .await?;
        let charts: Vec<ChartSummary> = decode_list(results)?;
        Ok(match search_term.filter(|term| !term.is_empty()) {
            Some(term) => {
                let needle = term.to_lowercase();
                charts
                    .into_iter()
                    .filter(|chart| chart.name.to_lowercase().contains(&needle))
                    .collect()
            }
            None => charts,
        })
    }

    /// Lists charts whose name or description contains `search_term`.
    ///
    /// # Errors
    /// Returns `ControlError` if the chart listing fails.
    pub async fn search_charts(&self, search_term: &str) -> ControlResult<Vec<ChartSummary>> {
        let needle = search_term.to_lowercase();
        Ok(self
            .list_charts(None)
            .await?
            .into_iter()
            .filter(|chart| {
                chart.name.to_lowercase().contains(&needle)
                    || chart.description.to_lowercase().contains(&needle)
            })
            .collect())
    }

    /// Resolves a chart by UUID or exact name.
    ///
    /// # Errors
    /// Returns `ControlError::NotFound` if no chart matches.
    pub async fn resolve_chart(&self, chart_identifier: &str) -> ControlResult<ChartSummary> {
        let charts = self.list_charts(None).await?;
        find_chart(&charts, chart_identifier).cloned().ok_or_else(|| {
            ControlError::NotFound(format!(
                "Chart '{chart_identifier}' not found. Use list-charts to see available charts."
            ))
        })
    }

    /// Fetches the full saved chart definition.
    ///
    /// # Errors
    /// Returns `ControlError` if the chart cannot be resolved or fetched.
    pub async fn get_chart_details(&self, chart_identifier: &str) -> ControlResult<Value> {
        let chart = self.resolve_chart(chart_identifier).await?;
        self.get_saved_chart(&chart.uuid).await
    }

    /// Creates a saved chart after validating its configuration.
    ///
    /// # Errors
    /// Returns `ControlError::InvalidInput` if the chart config references
    /// fields missing from the query, or a client error if the API rejects it.
    pub async fn create_chart(&self, request: CreateChartRequest) -> ControlResult<CreatedChart> {
        let CreateChartRequest {
            name,
            table_name,
            space_uuid,
            mut metric_query,
            chart_config,
            pivot_config,
            description,
        } = request;

        sync_additional_metrics(&mut metric_query);
        validate_chart_config(&chart_config, &metric_query)?;
        let table_config = build_table_config(&metric_query);
        let column_order = table_config["columnOrder"]
            .as_array()
            .map(|columns| {
                columns
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let mut payload = json!({
            "name": name,
            "description": description.unwrap_or_default(),
            "tableName": table_name,
            "metricQuery": metric_query,
            "chartConfig": chart_config,
            "tableConfig": table_config,
            "spaceUuid": space_uuid,
        });
        if let Some(pivot) = pivot_config.filter(|pivot| !pivot.is_null()) {
            payload["pivotConfig"] = pivot;
        }

        let project = self.project_uuid(None).await?;
        let created = self
            .client
            .post(&["projects", project.as_str(), "saved"], &payload)
            .await?;
        let uuid = str_field(&created, "uuid");
        info!(chart_uuid = %uuid, "created chart");
        Ok(CreatedChart { uuid, column_order })
    }

    /// Saves a new version of a chart with the requested changes applied.
    ///
    /// # Errors
    /// Returns `ControlError` if the chart cannot be resolved or the version is rejected.
    pub async fn update_chart(&self, request: UpdateChartRequest) -> ControlResult<ChartUpdate> {
        let chart = self.resolve_chart(&request.chart_identifier).await?;
        let current = self.get_saved_chart(&chart.uuid).await?;
        let mut payload = version_payload(&current);
        let mut updated_fields = Vec::new();

        if let Some(name) = request.name.filter(|name| !name.is_empty()) {
            updated_fields.push(format!("name: '{name}'"));
            payload["name"] = Value::String(name);
        }
        if let Some(description) = request.description.filter(|text| !text.is_empty()) {
            payload["description"] = Value::String(description);
            updated_fields.push("description".to_string());
        }
        if let Some(updates) = request.metric_query {
            let keys = updates
                .as_object()
                .map(|fields| fields.keys().cloned().collect::<Vec<_>>().join(", "))
                .unwrap_or_default();
            deep_merge(&mut payload["metricQuery"], updates);
            updated_fields.push(format!("metricQuery ({keys})"));
        }
        if let Some(updates) = request.chart_config {
            deep_merge(&mut payload["chartConfig"], updates);
            updated_fields.push("chartConfig".to_string());
        }
        if let Some(pivot) = request.pivot_config {
            updated_fields.push(if pivot.is_null() {
                "pivotConfig (removed)".to_string()
            } else {
                "pivotConfig".to_string()
            });
            payload["pivotConfig"] = pivot;
        }

        if !updated_fields.is_empty() {
            self.client
                .post(&["saved", chart.uuid.as_str(), "version"], &payload)
                .await?;
            info!(chart_uuid = %chart.uuid, fields = updated_fields.len(), "saved chart version");
        }
        Ok(ChartUpdate {
            uuid: chart.uuid,
            name: chart.name,
            updated_fields,
        })
    }

    /// Deletes a saved chart by UUID or exact name.
    ///
    /// # Errors
    /// Returns `ControlError` if the chart cannot be resolved or deleted.
    pub async fn delete_chart(&self, chart_identifier: &str) -> ControlResult<ChartSummary> {
        let chart = self.resolve_chart(chart_identifier).await?;
        self.client
            .delete(&["saved", chart.uuid.as_str()])
            .await?;
        info!(chart_uuid = %chart.uuid, "deleted chart");
        Ok(chart)
    }

    /// Runs a saved chart's query and renders the rows as CSV.
    ///
    /// # Errors
    /// Returns `ControlError` if the query fails.
    pub async fn run_chart_query(
        &self,
        chart_uuid: &str,
        limit: Option<usize>,
    ) -> ControlResult<String> {
        let limit = limit.filter(|limit| *limit > 0);
        let body = limit.map_or_else(|| json!({}), |limit| json!({ "limit": limit }));
        let results = self
            .client
            .post(&["saved", chart_uuid, "results"], &body)
            .await?;

        let mut rows = QueryRows::from_results(results).flattened();
        if let Some(limit) = limit {
            rows.rows.truncate(limit);
        }
        let metadata = json!({ "row_count": rows.rows.len() });
        Ok(format_as_csv(&rows.rows, Some(&metadata)))
    }

    pub(crate) async fn get_saved_chart(&self, chart_uuid: &str) -> ControlResult<Value> {
        Ok(self
            .client
            .get(&["saved", chart_uuid])
            .await?)
    }
}
