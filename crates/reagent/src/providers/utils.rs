use lazy_static::lazy_static;
use regex::Regex;
use reqwest::{Response, StatusCode};
use serde_json::{json, Value};
use std::collections::HashSet;

use super::errors::{ProviderError, ProviderResult};
use crate::models::tool::Tool;

lazy_static! {
    static ref INVALID_NAME_CHARS: Regex = Regex::new(r"[^a-zA-Z0-9_-]").unwrap();
}

/// Turn an HTTP response into its json body, mapping failures onto ProviderError
pub async fn handle_response(response: Response) -> ProviderResult<Value> {
    match response.status() {
        StatusCode::OK => Ok(response.json().await?),
        status if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() => {
            Err(ProviderError::ServerError(status.as_u16()))
        }
        status => {
            let body = response.text().await.unwrap_or_default();
            // Some endpoints report context overflow as a 400 with a structured error body
            if let Ok(payload) = serde_json::from_str::<Value>(&body) {
                if let Some(error) = payload.get("error") {
                    if let Some(err) = check_openai_context_length_error(error) {
                        return Err(err);
                    }
                }
            }
            Err(ProviderError::RequestFailed {
                status: status.as_u16(),
                body,
            })
        }
    }
}

pub fn sanitize_function_name(name: &str) -> String {
    INVALID_NAME_CHARS.replace_all(name, "_").to_string()
}

/// Reject tool lists the providers would refuse anyway
pub fn check_unique_tool_names(tools: &[Tool]) -> ProviderResult<()> {
    let mut tool_names = HashSet::new();
    for tool in tools {
        if !tool_names.insert(sanitize_function_name(&tool.name)) {
            return Err(ProviderError::InvalidRequest(format!(
                "Duplicate tool name: {}",
                tool.name
            )));
        }
    }
    Ok(())
}

/// Parse tool call arguments delivered as a json encoded string.
///
/// An empty string means no arguments. Anything that does not parse is kept
/// verbatim as a json string so the failure is reported against that one call.
pub fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return json!({});
    }
    serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Wrap a non-object value so it can be used where a provider insists on an object
pub fn as_object(value: Value, key: &str) -> Value {
    if value.is_object() {
        value
    } else {
        let mut wrapped = serde_json::Map::new();
        wrapped.insert(key.to_string(), value);
        Value::Object(wrapped)
    }
}

pub fn check_openai_context_length_error(error: &Value) -> Option<ProviderError> {
    let code = error.get("code")?.as_str()?;
    if code == "context_length_exceeded" || code == "string_above_max_length" {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        Some(ProviderError::ContextLengthExceeded(message))
    } else {
        None
    }
}

/// Set `key` on a json object payload when a value is present
pub fn insert_if_some<T: serde::Serialize>(payload: &mut Value, key: &str, value: Option<T>) {
    if let (Some(object), Some(value)) = (payload.as_object_mut(), value) {
        object.insert(key.to_string(), json!(value));
    }
}

/// Tool calls listed under `key`, empty when the field is absent or null.
/// Any other non-list value is a malformed response.
pub fn tool_call_list<'a>(message: &'a Value, key: &str) -> ProviderResult<&'a [Value]> {
    match message.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(calls)) => Ok(calls),
        Some(other) => Err(ProviderError::MalformedResponse(format!(
            "Expected `{}` to be a list, got: {}",
            key, other
        ))),
    }
}

pub fn read_token_count(value: &Value, key: &str) -> Option<i32> {
    value.get(key).and_then(|v| v.as_i64()).map(|v| v as i32)
}
