use rmcp::{
    ErrorData,
    model::{CallToolResult, Content},
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};

use crate::LightdashMcp;

/// Payload listing every MCP command with its description.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct HelpCommands {
    pub commands: Vec<String>,
}

const CHART_CONFIG_GUIDE: &str = r#"
Building charts for create-chart / update-chart
================================================

1. metricQuery
    {
      "exploreName": "orders",
      "dimensions": ["orders_order_date_day"],
      "metrics": ["orders_total_revenue"],
      "filters": {"dimensions": {"id": "root", "and": [ <filter>, ... ]}},
      "sorts": [{"fieldId": "orders_order_date_day", "descending": true}],
      "limit": 500,
      "tableCalculations": [],
      "additionalMetrics": [],
      "customDimensions": []
    }
    - Field ids are "{table}_{field}". Use get-explore-schema to find them.

2. additionalMetrics (ad-hoc metrics)
    {"name": "dau", "label": "Daily Active Users", "type": "count_distinct",
     "sql": "${TABLE}.user_id", "table": "orders", "baseDimensionName": "user_id"}
    - Referenced as "{table}_{name}", e.g. "orders_dau".
    - Types: count_distinct, count, sum, avg, min, max.

3. customDimensions (SQL buckets)
    {"id": "status_group", "name": "Status Group", "type": "sql", "table": "orders",
     "sql": "CASE WHEN status = 'shipped' THEN 'Done' ELSE 'Open' END", "dimensionType": "string"}
    - Add the id to "dimensions" to group by it, or to pivotConfig.columns to split series.

4. chartConfig (cartesian)
    {
      "type": "cartesian",
      "config": {
        "layout": {"xField": "orders_order_date_day", "yField": ["orders_total_revenue"], "flipAxes": false},
        "eChartsConfig": {
          "xAxis": [{"name": "Date"}],
          "yAxis": [{"name": "Revenue"}],
          "series": [{
            "type": "line",
            "encode": {"xRef": {"field": "orders_order_date_day"}, "yRef": {"field": "orders_total_revenue"}},
            "yAxisIndex": 0
          }]
        }
      }
    }
    - eChartsConfig.series is required and needs at least one entry.
    - encode.xRef / encode.yRef must be objects: {"field": "..."}. Plain strings break the chart.
    - Every referenced field must appear in dimensions, metrics, additionalMetrics or customDimensions.
    - Series types: line, bar, area, scatter. Add "stack" to stack bars.
    - Other chart types: table, big_number, pie, funnel.

5. pivotConfig (optional)
    {"columns": ["orders_country"]} produces one series per country.

6. Filters
    - equals / notEquals / contains: {"operator": "equals", "values": ["US"]}
    - isNull / notNull: {"operator": "notNull"}
    - inThePast:
        {"id": "f1", "target": {"fieldId": "orders_order_date_day"}, "operator": "inThePast",
         "values": [30], "required": false, "settings": {"completed": false, "unitOfTime": "days"}}
      The number goes in "values", not in settings. "completed" must be false.
      unitOfTime: days, weeks, months, years.

7. tableConfig.columnOrder is generated from the metric query; do not send it.
"#;

#[tool_router(router = tool_router_context, vis = "pub")]
impl LightdashMcp {
    #[tool(description = "List every MCP command this server provides with a short description.")]
    async fn help(&self) -> Result<CallToolResult, ErrorData> {
        let commands = self
            .tools()
            .iter()
            .map(|tool| {
                format!(
                    "{} - {}",
                    tool.name,
                    tool.description.as_deref().unwrap_or_default()
                )
            })
            .collect();
        Ok(CallToolResult::success(vec![Content::json(HelpCommands { commands })?]))
    }

    #[tool(
        name = "chart-config-help",
        description = "Reference for metric queries, chart configurations, filters and pivots. Read before create-chart."
    )]
    async fn chart_config_help(&self) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::text(CHART_CONFIG_GUIDE)]))
    }
}
