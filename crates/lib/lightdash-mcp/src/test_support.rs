//! Shared helpers for tool tests.

use lightdash_core::client::{ClientConfig, LightdashClient};
use lightdash_core::control::LightdashControl;
use rmcp::model::{CallToolResult, RawContent};
use serde_json::{Value, json};

use crate::LightdashMcp;

pub const PROJECT: &str = "p1";

/// Server pointed at a Lightdash base URL with `p1` as the default project.
pub fn server_for(base_url: &str) -> LightdashMcp {
    let client = LightdashClient::new(&ClientConfig::new(base_url, "test-token"))
        .expect("client should build");
    LightdashMcp::new(LightdashControl::new(client).with_default_project(Some(PROJECT.to_string())))
}

/// Server for tests that never reach the network.
pub fn offline_server() -> LightdashMcp {
    server_for("http://127.0.0.1:9")
}

/// Lightdash response envelope around `results`.
pub fn envelope(results: Value) -> String {
    json!({ "status": "ok", "results": results }).to_string()
}

/// Extract the text content from a `CallToolResult`.
pub fn text_of(result: &CallToolResult) -> String {
    assert_eq!(result.content.len(), 1, "expected exactly one content item");
    match &result.content[0].raw {
        RawContent::Text(text_content) => text_content.text.clone(),
        _ => panic!("expected text content"),
    }
}

/// Parse JSON content produced by `Content::json`.
pub fn json_of(result: &CallToolResult) -> Value {
    serde_json::from_str(&text_of(result)).expect("content should be JSON")
}
