//! Saved chart payload helpers: metric syncing, config validation, table
//! column ordering and version payloads for chart updates.

use std::collections::BTreeSet;

use serde_json::{Map, Value, json};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChartConfigError {
    #[error("chartConfig must be an object with 'config' and 'eChartsConfig' keys.")]
    MissingEChartsConfig,
    #[error("eChartsConfig must have a 'series' list.")]
    MissingSeries,
    #[error("Series {index} is missing 'encode' configuration.")]
    MissingEncode { index: usize },
    #[error(
        "Series {index} '{key}' must be an object with a 'field' key (e.g., {{\"field\": \"my_field\"}}). It should not be a plain string."
    )]
    InvalidReference { index: usize, key: &'static str },
    #[error(
        "Series {index} references field '{field}' which is not present in the metricQuery dimensions, metrics, or additionalMetrics. Available fields: {available:?}"
    )]
    UnknownField {
        index: usize,
        field: String,
        available: Vec<String>,
    },
}

/// `{table}_{name}` field ids of the query's additional metrics.
#[must_use]
pub fn additional_metric_ids(metric_query: &Value) -> Vec<String> {
    array(metric_query, "additionalMetrics")
        .iter()
        .filter_map(|metric| {
            let table = metric.get("table").and_then(Value::as_str)?;
            let name = metric.get("name").and_then(Value::as_str)?;
            (!table.is_empty() && !name.is_empty()).then(|| format!("{table}_{name}"))
        })
        .collect()
}

/// Appends every additional metric id to `metrics` unless already listed.
pub fn sync_additional_metrics(metric_query: &mut Value) {
    let ids = additional_metric_ids(metric_query);
    let Some(query) = metric_query.as_object_mut() else {
        return;
    };
    let metrics = query
        .entry("metrics")
        .or_insert_with(|| Value::Array(Vec::new()));
    if !metrics.is_array() {
        *metrics = Value::Array(Vec::new());
    }
    if let Value::Array(metrics) = metrics {
        for id in ids {
            if !metrics.iter().any(|metric| metric.as_str() == Some(id.as_str())) {
                metrics.push(Value::String(id));
            }
        }
    }
}

/// Every field id a chart series may reference.
#[must_use]
pub fn available_fields(metric_query: &Value) -> BTreeSet<String> {
    let mut fields: BTreeSet<String> = strings(metric_query, "dimensions")
        .chain(strings(metric_query, "metrics"))
        .map(str::to_string)
        .collect();
    fields.extend(additional_metric_ids(metric_query));
    fields.extend(
        array(metric_query, "customDimensions")
            .iter()
            .filter_map(|dimension| dimension.get("id").and_then(Value::as_str))
            .filter(|id| !id.is_empty())
            .map(str::to_string),
    );
    fields
}

/// Checks the `eChartsConfig` series of a chart config against the query.
///
/// # Errors
/// Returns `ChartConfigError` for the first structural problem or unknown
/// field reference found.
pub fn validate_chart_config(
    chart_config: &Value,
    metric_query: &Value,
) -> Result<(), ChartConfigError> {
    let echarts = chart_config
        .get("config")
        .and_then(|config| config.get("eChartsConfig"))
        .ok_or(ChartConfigError::MissingEChartsConfig)?;
    let series = echarts
        .get("series")
        .and_then(Value::as_array)
        .ok_or(ChartConfigError::MissingSeries)?;

    let available = available_fields(metric_query);
    for (index, entry) in series.iter().enumerate() {
        let encode = entry
            .get("encode")
            .ok_or(ChartConfigError::MissingEncode { index })?;
        for key in ["xRef", "yRef"] {
            let Some(reference) = encode.get(key) else {
                continue;
            };
            let field = reference
                .as_object()
                .and_then(|reference| reference.get("field"))
                .ok_or(ChartConfigError::InvalidReference { index, key })?;
            let field = field.as_str().map_or_else(|| field.to_string(), str::to_string);
            if !available.contains(&field) {
                return Err(ChartConfigError::UnknownField {
                    index,
                    field,
                    available: available.iter().cloned().collect(),
                });
            }
        }
    }
    Ok(())
}

/// Derives `tableConfig` with a `columnOrder` of dimensions, custom dimension
/// ids, custom dimension names, metrics (including additional metrics) and
/// table calculations.
#[must_use]
pub fn build_table_config(metric_query: &Value) -> Value {
    let custom = array(metric_query, "customDimensions");
    let mut metrics: Vec<String> = strings(metric_query, "metrics").map(str::to_string).collect();
    for id in additional_metric_ids(metric_query) {
        if !metrics.contains(&id) {
            metrics.push(id);
        }
    }

    let column_order: Vec<String> = strings(metric_query, "dimensions")
        .map(str::to_string)
        .chain(custom.iter().filter_map(|dimension| non_empty_str(dimension, "id")))
        .chain(custom.iter().filter_map(|dimension| non_empty_str(dimension, "name")))
        .chain(metrics)
        .chain(
            array(metric_query, "tableCalculations")
                .iter()
                .filter_map(|calculation| non_empty_str(calculation, "name")),
        )
        .collect();

    json!({ "columnOrder": column_order })
}

/// Merges `updates` into `base`: nested objects merge key by key, any other
/// value (arrays included) replaces what was there.
pub fn deep_merge(base: &mut Value, updates: Value) {
    match (base, updates) {
        (Value::Object(base), Value::Object(updates)) => {
            for (key, value) in updates {
                let nested = value.is_object() && base.get(&key).is_some_and(Value::is_object);
                match base.get_mut(&key) {
                    Some(existing) if nested => deep_merge(existing, value),
                    _ => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, updates) => *base = updates,
    }
}

/// Starting payload for `POST /saved/{uuid}/version` built from the current
/// chart. `metricOverrides` is dropped and additional metrics lose their
/// server-generated `uuid`.
#[must_use]
pub fn version_payload(chart: &Value) -> Value {
    let mut metric_query = chart
        .get("metricQuery")
        .cloned()
        .filter(Value::is_object)
        .unwrap_or_else(|| Value::Object(Map::new()));
    if let Some(query) = metric_query.as_object_mut() {
        query.shift_remove("metricOverrides");
        if let Some(Value::Array(metrics)) = query.get_mut("additionalMetrics") {
            for metric in metrics.iter_mut().filter_map(Value::as_object_mut) {
                metric.shift_remove("uuid");
            }
        }
    }

    let object_or_empty = |key: &str| {
        chart
            .get(key)
            .cloned()
            .filter(|value| !value.is_null())
            .unwrap_or_else(|| Value::Object(Map::new()))
    };

    let mut payload = json!({
        "tableName": chart.get("tableName").cloned().unwrap_or(Value::Null),
        "metricQuery": metric_query,
        "chartConfig": object_or_empty("chartConfig"),
        "tableConfig": object_or_empty("tableConfig"),
    });
    if let Some(pivot) = chart.get("pivotConfig").filter(|pivot| is_truthy(pivot)) {
        payload["pivotConfig"] = pivot.clone();
    }
    payload
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::String(text) => !text.is_empty(),
        Value::Number(_) => true,
    }
}

fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn strings<'a>(value: &'a Value, key: &str) -> impl Iterator<Item = &'a str> {
    array(value, key).iter().filter_map(Value::as_str)
}

fn non_empty_str(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}
