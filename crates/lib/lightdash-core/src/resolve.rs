//! Name resolution for dashboards, charts, spaces and tiles.
//!
//! Lightdash tools accept human names where the API wants UUIDs. Each entity
//! kind has its own matching rule; all comparisons ignore case.

use serde_json::Value;

use crate::models::{ChartSummary, DashboardSummary, SpaceSummary};

/// Finds a dashboard by exact name, falling back to the first substring match.
#[must_use]
pub fn find_dashboard<'a>(
    dashboards: &'a [DashboardSummary],
    name: &str,
) -> Option<&'a DashboardSummary> {
    let needle = name.to_lowercase();
    dashboards
        .iter()
        .find(|dashboard| dashboard.name.to_lowercase() == needle)
        .or_else(|| {
            dashboards
                .iter()
                .find(|dashboard| dashboard.name.to_lowercase().contains(&needle))
        })
}

/// Finds a chart by UUID first, then by exact name.
#[must_use]
pub fn find_chart<'a>(charts: &'a [ChartSummary], identifier: &str) -> Option<&'a ChartSummary> {
    charts
        .iter()
        .find(|chart| chart.uuid == identifier)
        .or_else(|| {
            let needle = identifier.to_lowercase();
            charts.iter().find(|chart| chart.name.to_lowercase() == needle)
        })
}

/// Finds a space whose UUID equals the identifier or whose name matches it exactly.
#[must_use]
pub fn find_space<'a>(spaces: &'a [SpaceSummary], identifier: &str) -> Option<&'a SpaceSummary> {
    let needle = identifier.to_lowercase();
    spaces
        .iter()
        .find(|space| space.uuid == identifier || space.name.to_lowercase() == needle)
}

/// Display title of a tile: `properties.title`, else `properties.chartName`.
#[must_use]
pub fn tile_title(tile: &Value) -> String {
    let properties = tile.get("properties");
    let non_empty = |key: &str| {
        properties
            .and_then(|props| props.get(key))
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    };
    non_empty("title")
        .or_else(|| non_empty("chartName"))
        .unwrap_or_default()
        .to_string()
}

/// Index of the first tile whose title contains the identifier.
#[must_use]
pub fn find_tile_index(tiles: &[Value], identifier: &str) -> Option<usize> {
    let needle = identifier.to_lowercase();
    tiles
        .iter()
        .position(|tile| tile_title(tile).to_lowercase().contains(&needle))
}

/// Non-empty titles of every tile, used in not-found messages.
#[must_use]
pub fn tile_titles(tiles: &[Value]) -> Vec<String> {
    tiles
        .iter()
        .map(tile_title)
        .filter(|title| !title.is_empty())
        .collect()
}
