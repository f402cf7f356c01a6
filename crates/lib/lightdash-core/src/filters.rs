//! Merging dashboard-level filters into a chart's own filters.

use serde_json::{Map, Value, json};

const MERGED_GROUP_ID: &str = "merged_root";
const FILTER_GROUPS: [&str; 2] = ["dimensions", "metrics"];

/// Combines chart filters with dashboard filters.
///
/// Empty dashboard filters keep the chart filters as they are. Empty chart
/// filters take the dashboard's `dimensions` and `metrics` groups. Otherwise
/// every group present on both sides is wrapped in a new `and` group holding
/// the chart group followed by the dashboard group.
#[must_use]
pub fn merge_filters(chart_filters: &Value, dashboard_filters: &Value) -> Value {
    if is_empty(dashboard_filters) {
        return chart_filters.clone();
    }

    let mut merged = Map::new();
    if is_empty(chart_filters) {
        for group in FILTER_GROUPS {
            merged.insert(group.to_string(), group_or_empty(dashboard_filters, group));
        }
        return Value::Object(merged);
    }

    for group in FILTER_GROUPS {
        let chart_group = group_or_empty(chart_filters, group);
        let dashboard_group = group_or_empty(dashboard_filters, group);
        let combined = match (is_empty(&chart_group), is_empty(&dashboard_group)) {
            (true, true) => Value::Object(Map::new()),
            (true, false) => dashboard_group,
            (false, true) => chart_group,
            (false, false) => json!({
                "id": MERGED_GROUP_ID,
                "and": [chart_group, dashboard_group],
            }),
        };
        merged.insert(group.to_string(), combined);
    }
    Value::Object(merged)
}

fn group_or_empty(filters: &Value, group: &str) -> Value {
    filters
        .get(group)
        .filter(|value| !value.is_null())
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()))
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn country_filter() -> Value {
        json!({"id": "root", "and": [{"id": "f1", "target": {"fieldId": "orders_country"}, "operator": "equals", "values": ["US"]}]})
    }

    fn date_filter() -> Value {
        json!({"id": "dash", "and": [{"id": "f2", "target": {"fieldId": "orders_date"}, "operator": "inThePast", "values": [7]}]})
    }

    #[test]
    fn empty_dashboard_filters_keep_chart_filters() {
        let chart = json!({"dimensions": country_filter(), "tableCalculations": {}});
        assert_eq!(merge_filters(&chart, &json!({})), chart);
        assert_eq!(merge_filters(&chart, &Value::Null), chart);
    }

    #[test]
    fn empty_chart_filters_take_dashboard_groups() {
        let dashboard = json!({"dimensions": date_filter()});
        let merged = merge_filters(&json!({}), &dashboard);
        assert_eq!(merged, json!({"dimensions": date_filter(), "metrics": {}}));
    }

    #[test]
    fn groups_on_both_sides_are_wrapped_in_merged_root() {
        let chart = json!({"dimensions": country_filter()});
        let dashboard = json!({"dimensions": date_filter(), "metrics": {"id": "m", "and": []}});

        let merged = merge_filters(&chart, &dashboard);

        assert_eq!(
            merged["dimensions"],
            json!({"id": "merged_root", "and": [country_filter(), date_filter()]})
        );
        assert_eq!(merged["metrics"], json!({"id": "m", "and": []}));
    }
}
