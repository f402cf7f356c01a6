use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Project entry returned by `list-projects`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    #[serde(default, deserialize_with = "null_as_default")]
    pub project_uuid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub project_type: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub warehouse_connection: WarehouseConnection,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub updated_at: String,
}

/// Warehouse type of a project; connection details are not exposed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WarehouseConnection {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub warehouse_type: String,
}

/// Saved chart entry returned by chart listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChartSummary {
    #[serde(default, deserialize_with = "null_as_default")]
    pub uuid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(
        rename(deserialize = "spaceName"),
        default,
        deserialize_with = "null_as_default"
    )]
    pub space: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DashboardSummary {
    #[serde(default, deserialize_with = "null_as_default")]
    pub uuid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

/// Space entry with content counts instead of the full content lists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", from = "SpaceRecord")]
pub struct SpaceSummary {
    pub uuid: String,
    pub name: String,
    pub is_private: bool,
    pub chart_count: usize,
    pub dashboard_count: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpaceRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    uuid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    is_private: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    queries: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    dashboards: Vec<Value>,
}

impl From<SpaceRecord> for SpaceSummary {
    fn from(record: SpaceRecord) -> Self {
        Self {
            uuid: record.uuid,
            name: record.name,
            is_private: record.is_private,
            chart_count: record.queries.len(),
            dashboard_count: record.dashboards.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExploreSummary {
    pub name: String,
    pub label: String,
    pub description: String,
    #[serde(rename = "type")]
    pub explore_type: String,
}

impl ExploreSummary {
    /// Builds a summary from a catalog entry. Keyed catalogs pass the key as
    /// `key_name`, which also becomes the fallback label.
    #[must_use]
    pub fn from_catalog_entry(entry: &Value, key_name: Option<&str>) -> Self {
        let text = |field: &str| entry.get(field).and_then(Value::as_str);
        let name = key_name
            .or_else(|| text("name"))
            .unwrap_or_default()
            .to_string();
        let label = text("label")
            .or(key_name)
            .unwrap_or_default()
            .to_string();
        Self {
            label,
            description: text("description").unwrap_or_default().to_string(),
            explore_type: text("type").unwrap_or("explore").to_string(),
            name,
        }
    }
}

/// Result of `list-explores`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExploreListing {
    pub explores: Vec<ExploreSummary>,
    pub count: usize,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chart_summary_reads_space_name() {
        let chart: ChartSummary = serde_json::from_value(json!({
            "uuid": "c1",
            "name": "Revenue",
            "spaceName": "Finance",
            "description": null,
            "updatedAt": "2024-01-01T00:00:00Z",
            "chartKind": "line"
        }))
        .expect("chart should decode");

        assert_eq!(chart.space, "Finance");
        assert_eq!(chart.description, "");
        let rendered = serde_json::to_value(&chart).expect("chart should encode");
        assert_eq!(rendered["space"], "Finance");
        assert_eq!(rendered["updatedAt"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn space_summary_counts_contents() {
        let space: SpaceSummary = serde_json::from_value(json!({
            "uuid": "s1",
            "name": "Shared",
            "isPrivate": true,
            "queries": [{"uuid": "q1"}, {"uuid": "q2"}],
            "dashboards": [{"uuid": "d1"}]
        }))
        .expect("space should decode");

        assert_eq!(space.chart_count, 2);
        assert_eq!(space.dashboard_count, 1);
        let rendered = serde_json::to_value(&space).expect("space should encode");
        assert_eq!(rendered["isPrivate"], true);
        assert_eq!(rendered["chartCount"], 2);
    }

    #[test]
    fn project_summary_keeps_only_warehouse_type() {
        let project: ProjectSummary = serde_json::from_value(json!({
            "projectUuid": "p1",
            "name": "Analytics",
            "type": "DEFAULT",
            "warehouseConnection": {"type": "bigquery", "project": "secret-gcp"}
        }))
        .expect("project should decode");

        let rendered = serde_json::to_value(&project).expect("project should encode");
        assert_eq!(rendered["warehouseConnection"], json!({"type": "bigquery"}));
        assert_eq!(rendered["createdAt"], "");
    }

    #[test]
    fn explore_summary_defaults_label_and_type_for_keyed_entries() {
        let summary = ExploreSummary::from_catalog_entry(&json!({"description": "Orders"}), Some("orders"));
        assert_eq!(summary.name, "orders");
        assert_eq!(summary.label, "orders");
        assert_eq!(summary.explore_type, "explore");
    }
}
