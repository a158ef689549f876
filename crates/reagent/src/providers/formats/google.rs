//! Gemini `generateContent` format.
//!
//! Function calls only sometimes carry an `id`. When they don't, positional ids
//! (`call_0`, `call_1`, ...) are synthesized, and results are sent back as
//! `functionResponse` parts matched by tool name in request order.
use serde_json::{json, Value};
use std::collections::HashMap;

use super::system_text;
use crate::models::message::Message;
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};
use crate::providers::base::Usage;
use crate::providers::errors::{ProviderError, ProviderResult};
use crate::providers::utils::{
    as_object, check_unique_tool_names, parse_arguments, read_token_count, sanitize_function_name,
};

pub fn system_to_google_spec(messages: &[Message]) -> Option<Value> {
    let system = system_text(messages);
    if system.is_empty() {
        None
    } else {
        Some(json!({"parts": [{"text": system}]}))
    }
}

/// Convert internal Message format to Gemini contents
///
/// Consecutive tool results are merged into one `user` content so the model
/// receives every response for a turn together.
pub fn messages_to_google_spec(messages: &[Message]) -> Vec<Value> {
    let mut contents: Vec<Value> = Vec::new();
    let mut names_by_id: HashMap<String, String> = HashMap::new();
    let mut collecting_results = false;

    for message in messages {
        match message.role {
            Role::System => continue,
            Role::User => {
                collecting_results = false;
                contents.push(json!({
                    "role": "user",
                    "parts": [{"text": message.text()}],
                }));
            }
            Role::Assistant => {
                collecting_results = false;
                let mut parts = Vec::new();
                let text = message.text();
                if !text.is_empty() {
                    parts.push(json!({"text": text}));
                }
                for request in message.tool_requests() {
                    let name = sanitize_function_name(&request.tool_call.name);
                    names_by_id.insert(request.id.clone(), name.clone());
                    parts.push(json!({
                        "functionCall": {
                            "name": name,
                            "args": as_object(request.tool_call.arguments.clone(), "arguments"),
                        }
                    }));
                }
                contents.push(json!({"role": "model", "parts": parts}));
            }
            Role::Tool => {
                let parts: Vec<Value> = message
                    .tool_responses()
                    .iter()
                    .map(|response| {
                        let name = names_by_id.get(&response.id).cloned().unwrap_or_default();
                        let payload = match &response.tool_result {
                            Ok(content) => as_object(content.as_model_value(), "result"),
                            Err(_) => json!({"error": response.as_model_text()}),
                        };
                        json!({"functionResponse": {"name": name, "response": payload}})
                    })
                    .collect();

                if collecting_results {
                    if let Some(existing) = contents
                        .last_mut()
                        .and_then(|c| c.get_mut("parts"))
                        .and_then(|p| p.as_array_mut())
                    {
                        existing.extend(parts);
                        continue;
                    }
                }
                contents.push(json!({"role": "user", "parts": parts}));
                collecting_results = true;
            }
        }
    }

    contents
}

pub fn tools_to_google_spec(tools: &[Tool]) -> ProviderResult<Vec<Value>> {
    check_unique_tool_names(tools)?;
    if tools.is_empty() {
        return Ok(vec![]);
    }

    let declarations: Vec<Value> = tools
        .iter()
        .map(|tool| {
            json!({
                "name": sanitize_function_name(&tool.name),
                "description": tool.description,
                "parameters": tool.input_schema,
            })
        })
        .collect();

    Ok(vec![json!({"functionDeclarations": declarations})])
}

pub fn google_response_to_message(response: &Value) -> ProviderResult<Message> {
    let candidate = response
        .get("candidates")
        .and_then(|c| c.get(0))
        .ok_or_else(|| {
            ProviderError::MalformedResponse(format!("No candidates in response: {}", response))
        })?;

    let parts = candidate
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| {
            let reason = candidate
                .get("finishReason")
                .and_then(|r| r.as_str())
                .unwrap_or("unknown");
            ProviderError::MalformedResponse(format!(
                "Candidate has no content parts (finish reason: {})",
                reason
            ))
        })?;

    let mut message = Message::assistant();
    let mut call_index = 0;
    for part in parts {
        if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
            if !text.is_empty() {
                message = message.with_text(text);
            }
        } else if let Some(call) = part.get("functionCall") {
            let id = match call.get("id").and_then(|id| id.as_str()) {
                Some(id) if !id.is_empty() => id.to_string(),
                _ => format!("call_{}", call_index),
            };
            call_index += 1;
            let name = call["name"].as_str().unwrap_or_default();
            let arguments = match &call["args"] {
                Value::String(raw) => parse_arguments(raw),
                Value::Null => json!({}),
                other => other.clone(),
            };
            message = message.with_tool_request(id, ToolCall::new(name, arguments));
        }
    }

    Ok(message)
}

pub fn get_google_usage(data: &Value) -> Usage {
    let usage = match data.get("usageMetadata") {
        Some(usage) => usage,
        None => return Usage::default(),
    };
    Usage::new(
        read_token_count(usage, "promptTokenCount"),
        read_token_count(usage, "candidatesTokenCount"),
        read_token_count(usage, "totalTokenCount"),
    )
}
