use serde_json::{Map, Value, json};

use crate::models::{ExploreListing, ExploreSummary};

use super::{ControlResult, LightdashControl};

impl LightdashControl {
    /// Lists explores from the project catalog as lightweight summaries.
    ///
    /// # Errors
    /// Returns `ControlError` if the project cannot be resolved or the catalog fetch fails.
    pub async fn list_explores(&self, project_uuid: Option<&str>) -> ControlResult<ExploreListing> {
        let catalog = self.get_catalog(project_uuid).await?;
        let explores: Vec<ExploreSummary> = match &catalog {
            Value::Object(entries) => entries
                .iter()
                .map(|(name, entry)| ExploreSummary::from_catalog_entry(entry, Some(name)))
                .collect(),
            Value::Array(entries) => entries
                .iter()
                .map(|entry| ExploreSummary::from_catalog_entry(entry, None))
                .collect(),
            _ => Vec::new(),
        };
        Ok(ExploreListing {
            count: explores.len(),
            explores,
        })
    }

    /// Fetches the raw project catalog.
    ///
    /// # Errors
    /// Returns `ControlError` if the project cannot be resolved or the request fails.
    pub async fn get_catalog(&self, project_uuid: Option<&str>) -> ControlResult<Value> {
        self.project_resource(project_uuid, "catalog").await
    }

    /// Fetches the metrics catalog.
    ///
    /// # Errors
    /// Returns `ControlError` if the project cannot be resolved or the request fails.
    pub async fn get_metrics_catalog(&self, project_uuid: Option<&str>) -> ControlResult<Value> {
        self.project_resource(project_uuid, "metrics").await
    }

    /// Fetches the custom metrics defined in the project.
    ///
    /// # Errors
    /// Returns `ControlError` if the project cannot be resolved or the request fails.
    pub async fn get_custom_metrics(&self, project_uuid: Option<&str>) -> ControlResult<Value> {
        self.project_resource(project_uuid, "custom-metrics").await
    }

    /// Fetches an explore and summarizes its tables, fields and joins.
    ///
    /// # Errors
    /// Returns `ControlError` if the project cannot be resolved or the explore fetch fails.
    pub async fn get_explore_schema(
        &self,
        table_name: &str,
        include_hidden: bool,
    ) -> ControlResult<Value> {
        let project = self.project_uuid(None).await?;
        let explore = self
            .client
            .get(&["projects", project.as_str(), "explores", table_name])
            .await?;
        Ok(summarize_explore(&explore, table_name, include_hidden))
    }

    async fn project_resource(
        &self,
        project_uuid: Option<&str>,
        resource: &str,
    ) -> ControlResult<Value> {
        let project = self.project_uuid(project_uuid).await?;
        Ok(self
            .client
            .get(&["projects", project.as_str(), resource])
            .await?)
    }
}

fn summarize_explore(explore: &Value, table_name: &str, include_hidden: bool) -> Value {
    let text = |value: &Value, key: &str, default: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    };

    let mut tables = Map::new();
    let mut total_dimensions = 0;
    let mut total_metrics = 0;
    if let Some(entries) = explore.get("tables").and_then(Value::as_object) {
        for (table_key, table) in entries {
            let dimensions = summarize_fields(table, "dimensions", table_key, include_hidden, false);
            let metrics = summarize_fields(table, "metrics", table_key, include_hidden, true);
            total_dimensions += dimensions.len();
            total_metrics += metrics.len();
            tables.insert(
                table_key.clone(),
                json!({
                    "name": text(table, "name", table_key),
                    "label": text(table, "label", ""),
                    "description": text(table, "description", ""),
                    "dimensions": dimensions,
                    "metrics": metrics,
                }),
            );
        }
    }

    let joins: Vec<Value> = explore
        .get("joinedTables")
        .and_then(Value::as_array)
        .map(|joins| {
            joins
                .iter()
                .map(|join| {
                    json!({
                        "table": text(join, "table", ""),
                        "type": text(join, "type", "left"),
                        "sqlOn": text(join, "sqlOn", ""),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let summary = json!({
        "totalTables": tables.len(),
        "totalDimensions": total_dimensions,
        "totalMetrics": total_metrics,
        "totalJoins": joins.len(),
    });
    json!({
        "exploreName": text(explore, "name", table_name),
        "baseTable": text(explore, "baseTable", table_name),
        "label": text(explore, "label", ""),
        "tags": explore.get("tags").cloned().unwrap_or_else(|| json!([])),
        "tables": tables,
        "joins": joins,
        "summary": summary,
    })
}

fn summarize_fields(
    table: &Value,
    kind: &str,
    table_key: &str,
    include_hidden: bool,
    with_sql: bool,
) -> Vec<Value> {
    let Some(fields) = table.get(kind).and_then(Value::as_object) else {
        return Vec::new();
    };
    fields
        .iter()
        .filter_map(|(key, field)| {
            let hidden = field.get("hidden").and_then(Value::as_bool).unwrap_or(false);
            if hidden && !include_hidden {
                return None;
            }
            let name = field.get("name").and_then(Value::as_str).unwrap_or(key);
            let text = |key: &str| field.get(key).and_then(Value::as_str).unwrap_or_default();
            let mut summary = json!({
                "name": name,
                "fieldId": format!("{table_key}_{name}"),
                "type": text("type"),
                "label": text("label"),
                "description": text("description"),
                "hidden": hidden,
                "table": field.get("table").and_then(Value::as_str).unwrap_or(table_key),
            });
            if with_sql {
                summary["sql"] = Value::String(text("sql").to_string());
            }
            Some(summary)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explore_summary_builds_field_ids_and_hides_hidden_fields() {
        let explore = json!({
            "name": "orders",
            "baseTable": "orders",
            "label": "Orders",
            "tables": {
                "orders": {
                    "name": "orders",
                    "label": "Orders",
                    "dimensions": {
                        "status": {"name": "status", "type": "string"},
                        "internal_id": {"name": "internal_id", "type": "number", "hidden": true}
                    },
                    "metrics": {
                        "total": {"name": "total", "type": "sum", "sql": "${TABLE}.amount"}
                    }
                }
            },
            "joinedTables": [{"table": "customers", "sqlOn": "orders.customer_id = customers.id"}]
        });

        let schema = summarize_explore(&explore, "orders", false);

        let dimensions = schema["tables"]["orders"]["dimensions"]
            .as_array()
            .expect("dimensions should be a list");
        assert_eq!(dimensions.len(), 1);
        assert_eq!(dimensions[0]["fieldId"], "orders_status");
        assert_eq!(schema["tables"]["orders"]["metrics"][0]["sql"], "${TABLE}.amount");
        assert_eq!(schema["joins"][0]["type"], "left");
        assert_eq!(
            schema["summary"],
            json!({"totalTables": 1, "totalDimensions": 1, "totalMetrics": 1, "totalJoins": 1})
        );

        let with_hidden = summarize_explore(&explore, "orders", true);
        assert_eq!(with_hidden["summary"]["totalDimensions"], 2);
    }
}
