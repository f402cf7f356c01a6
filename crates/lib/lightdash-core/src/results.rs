//! Shaping of query results: row flattening and CSV rendering.

use serde::Serialize;
use serde_json::{Map, Value};

/// Rows returned by a query together with the field metadata.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct QueryRows {
    pub rows: Vec<Value>,
    pub row_count: usize,
    pub fields: Value,
}

impl QueryRows {
    /// Splits a `runQuery`/`results` payload into rows and fields.
    #[must_use]
    pub fn from_results(mut results: Value) -> Self {
        let rows = match results.get_mut("rows").map(Value::take) {
            Some(Value::Array(rows)) => rows,
            _ => Vec::new(),
        };
        let fields = results
            .get_mut("fields")
            .map(Value::take)
            .filter(|fields| !fields.is_null())
            .unwrap_or_else(|| Value::Object(Map::new()));
        Self {
            row_count: rows.len(),
            rows,
            fields,
        }
    }

    /// Replaces every `{"value": {"raw": x}}` cell with `x`.
    #[must_use]
    pub fn flattened(self) -> Self {
        Self {
            rows: flatten_rows(&self.rows),
            ..self
        }
    }

    /// CSV rendering with `{row_count, fields}` metadata.
    #[must_use]
    pub fn to_csv(&self) -> String {
        let metadata = serde_json::json!({
            "row_count": self.row_count,
            "fields": self.fields,
        });
        format_as_csv(&self.rows, Some(&metadata))
    }
}

/// Replaces every `{"value": {"raw": x, ...}}` cell with `x`; other cells are kept.
#[must_use]
pub fn flatten_rows(rows: &[Value]) -> Vec<Value> {
    rows.iter()
        .map(|row| match row {
            Value::Object(cells) => Value::Object(
                cells
                    .iter()
                    .map(|(key, cell)| (key.clone(), raw_cell(cell).clone()))
                    .collect(),
            ),
            other => other.clone(),
        })
        .collect()
}

fn raw_cell(cell: &Value) -> &Value {
    cell.get("value")
        .and_then(|value| value.get("raw"))
        .unwrap_or(cell)
}

/// Renders rows as CSV. The header comes from the first row's keys; cells
/// missing from later rows are left empty. An optional metadata object is
/// written first as a `# Metadata: {...}` comment line.
#[must_use]
pub fn format_as_csv(rows: &[Value], metadata: Option<&Value>) -> String {
    let mut out = String::new();
    if let Some(metadata) = metadata {
        out.push_str("# Metadata: ");
        out.push_str(&metadata.to_string());
        out.push('\n');
    }

    let Some(first) = rows.first() else {
        out.push_str("# No data rows\n");
        return out;
    };

    let header: Vec<&str> = first
        .as_object()
        .map(|cells| cells.keys().map(String::as_str).collect())
        .unwrap_or_default();
    push_record(&mut out, header.iter().map(|name| escape_field(name)));

    for row in rows {
        push_record(
            &mut out,
            header
                .iter()
                .map(|name| escape_field(&render_cell(row.get(*name)))),
        );
    }
    out
}

fn push_record(out: &mut String, fields: impl Iterator<Item = String>) {
    let record: Vec<String> = fields.collect();
    out.push_str(&record.join(","));
    out.push('\n');
}

fn render_cell(cell: Option<&Value>) -> String {
    match cell {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_raw_values_and_keeps_plain_cells() {
        let rows = vec![json!({
            "orders_count": {"value": {"raw": 42, "formatted": "42"}},
            "orders_status": "shipped",
            "orders_meta": {"value": {"formatted": "n/a"}}
        })];

        let flat = flatten_rows(&rows);

        assert_eq!(
            flat[0],
            json!({
                "orders_count": 42,
                "orders_status": "shipped",
                "orders_meta": {"value": {"formatted": "n/a"}}
            })
        );
    }

    #[test]
    fn renders_header_from_first_row_in_key_order() {
        let rows = vec![
            json!({"b_name": "widget, large", "a_total": 3.5}),
            json!({"b_name": "say \"hi\"", "a_total": null}),
            json!({"b_name": "partial"}),
        ];

        let csv = format_as_csv(&rows, None);

        assert_eq!(
            csv,
            "b_name,a_total\n\"widget, large\",3.5\n\"say \"\"hi\"\"\",\npartial,\n"
        );
    }

    #[test]
    fn writes_metadata_line_for_empty_results() {
        let csv = format_as_csv(&[], Some(&json!({"row_count": 0})));
        assert_eq!(csv, "# Metadata: {\"row_count\":0}\n# No data rows\n");
        assert_eq!(format_as_csv(&[], None), "# No data rows\n");
    }

    #[test]
    fn query_rows_default_missing_fields_to_empty_object() {
        let rows = QueryRows::from_results(json!({"rows": [{"a": {"value": {"raw": 1}}}]}))
            .flattened();

        assert_eq!(rows.row_count, 1);
        assert_eq!(rows.fields, json!({}));
        assert_eq!(
            rows.to_csv(),
            "# Metadata: {\"row_count\":1,\"fields\":{}}\na\n1\n"
        );
    }
}
