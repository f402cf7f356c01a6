use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::chart_config::ChartConfigError;
use crate::client::{ClientError, LightdashClient};

pub mod catalog;
pub mod charts;
pub mod dashboards;
pub mod execution;
pub mod projects;
pub mod spaces;
pub mod tiles;

pub use charts::{ChartUpdate, CreateChartRequest, CreatedChart, UpdateChartRequest};
pub use dashboards::{CreateDashboardRequest, CreatedDashboard};
pub use execution::{DEFAULT_QUERY_LIMIT, TileRunReport, TileRunStatus, TileStatus};
pub use tiles::DeletedTile;

/// Default number of dashboard tiles executed concurrently.
pub const DEFAULT_TILE_CONCURRENCY: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    NotFound(String),
}

impl From<ChartConfigError> for ControlError {
    fn from(err: ChartConfigError) -> Self {
        Self::InvalidInput(format!("Chart configuration validation failed: {err}"))
    }
}

impl From<serde_json::Error> for ControlError {
    fn from(err: serde_json::Error) -> Self {
        Self::Client(ClientError::Decode(err))
    }
}

pub type ControlResult<T> = Result<T, ControlError>;

/// Implements every tool operation on top of the Lightdash client.
#[derive(Debug, Clone)]
pub struct LightdashControl {
    client: LightdashClient,
    default_project: Option<String>,
    tile_concurrency: usize,
}

impl LightdashControl {
    #[must_use]
    pub const fn new(client: LightdashClient) -> Self {
        Self {
            client,
            default_project: None,
            tile_concurrency: DEFAULT_TILE_CONCURRENCY,
        }
    }

    /// Project used when a tool call does not name one.
    #[must_use]
    pub fn with_default_project(mut self, project_uuid: Option<String>) -> Self {
        self.default_project = project_uuid.filter(|uuid| !uuid.trim().is_empty());
        self
    }

    /// Upper bound on in-flight tile queries; values below 1 are raised to 1.
    #[must_use]
    pub fn with_tile_concurrency(mut self, tile_concurrency: usize) -> Self {
        self.tile_concurrency = tile_concurrency.max(1);
        self
    }
}

/// Decodes a listing; a `null` result is an empty list.
fn decode_list<T: DeserializeOwned>(value: Value) -> ControlResult<Vec<T>> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_value(value)?)
}

/// String field of a response object, empty when absent.
fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
