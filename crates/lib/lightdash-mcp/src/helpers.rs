use std::borrow::Cow;

use lightdash_core::client::ClientError;
use lightdash_core::control::ControlError;
use rmcp::ErrorData;
use rmcp::model::{CallToolResult, Content, ErrorCode};
use serde::Serialize;
use serde_json::{Value, json};

pub fn mcp_err(code: ErrorCode, message: impl Into<Cow<'static, str>>) -> ErrorData {
    ErrorData {
        code,
        message: message.into(),
        data: None,
    }
}

/// Maps control-plane failures onto MCP error codes. Lightdash API errors keep
/// the remote status and body in `data`.
pub fn map_err(err: ControlError) -> ErrorData {
    match err {
        ControlError::InvalidInput(message) => mcp_err(ErrorCode::INVALID_PARAMS, message),
        ControlError::NotFound(message) => mcp_err(ErrorCode::RESOURCE_NOT_FOUND, message),
        ControlError::Client(ClientError::Api { status, body }) => ErrorData {
            code: ErrorCode::INTERNAL_ERROR,
            message: format!("Lightdash API returned {status}").into(),
            data: Some(json!({ "status": status.as_u16(), "body": body })),
        },
        ControlError::Client(err) => mcp_err(ErrorCode::INTERNAL_ERROR, err.to_string()),
    }
}

/// Parses a JSON-string tool argument.
pub fn parse_json_arg(name: &str, raw: &str) -> Result<Value, ErrorData> {
    serde_json::from_str(raw).map_err(|err| {
        mcp_err(
            ErrorCode::INVALID_PARAMS,
            format!("Error parsing {name} JSON: {err}"),
        )
    })
}

/// Like [`parse_json_arg`], treating a missing or blank argument as absent.
pub fn parse_optional_json_arg(
    name: &str,
    raw: Option<&str>,
) -> Result<Option<Value>, ErrorData> {
    raw.filter(|raw| !raw.trim().is_empty())
        .map(|raw| parse_json_arg(name, raw))
        .transpose()
}

/// Parses an optional JSON array argument; absent means empty.
pub fn parse_json_array_arg(name: &str, raw: Option<&str>) -> Result<Vec<Value>, ErrorData> {
    match parse_optional_json_arg(name, raw)? {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(mcp_err(
            ErrorCode::INVALID_PARAMS,
            format!("{name} must be a JSON array"),
        )),
    }
}

pub fn json_result(value: impl Serialize) -> Result<CallToolResult, ErrorData> {
    Ok(CallToolResult::success(vec![Content::json(value)?]))
}

pub fn text_result(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_keep_status_and_body() {
        let err = map_err(ControlError::Client(ClientError::Api {
            status: lightdash_core::client::StatusCode::NOT_FOUND,
            body: json!({"error": {"message": "missing"}}),
        }));
        assert_eq!(err.code, ErrorCode::INTERNAL_ERROR);
        assert_eq!(
            err.data,
            Some(json!({"status": 404, "body": {"error": {"message": "missing"}}}))
        );
    }

    #[test]
    fn control_errors_map_to_protocol_codes() {
        let invalid = map_err(ControlError::InvalidInput("bad".to_string()));
        assert_eq!(invalid.code, ErrorCode::INVALID_PARAMS);
        assert_eq!(invalid.message, "bad");

        let missing = map_err(ControlError::NotFound("gone".to_string()));
        assert_eq!(missing.code, ErrorCode::RESOURCE_NOT_FOUND);
    }

    #[test]
    fn json_arguments_are_validated() {
        let err = parse_json_arg("filters", "{not json").expect_err("invalid JSON");
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert!(err.message.starts_with("Error parsing filters JSON"));

        assert_eq!(parse_optional_json_arg("pivot_config", Some("  ")).ok(), Some(None));
        assert_eq!(
            parse_optional_json_arg("pivot_config", Some("null")).ok(),
            Some(Some(Value::Null))
        );
        assert!(parse_json_array_arg("tiles", Some("{}")).is_err());
        assert_eq!(parse_json_array_arg("tabs", None).ok(), Some(Vec::new()));
    }
}
