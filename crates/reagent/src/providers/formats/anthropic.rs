use serde_json::{json, Value};

use super::system_text;
use crate::models::message::Message;
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};
use crate::providers::base::Usage;
use crate::providers::errors::{ProviderError, ProviderResult};
use crate::providers::utils::{
    as_object, check_unique_tool_names, read_token_count, sanitize_function_name,
};

/// The system prompt, which Anthropic takes as a top level field rather than a message
pub fn system_to_anthropic_spec(messages: &[Message]) -> Option<String> {
    let system = system_text(messages);
    if system.is_empty() {
        None
    } else {
        Some(system)
    }
}

/// Convert internal Message format to Anthropic's messages specification
///
/// All tool results answering one assistant turn must arrive together in the
/// next user message, so consecutive tool messages are merged into a single
/// user message of `tool_result` blocks.
pub fn messages_to_anthropic_spec(messages: &[Message]) -> Vec<Value> {
    let mut messages_spec: Vec<Value> = Vec::new();
    let mut collecting_results = false;

    for message in messages {
        match message.role {
            Role::System => continue,
            Role::User => {
                collecting_results = false;
                messages_spec.push(json!({
                    "role": "user",
                    "content": [{"type": "text", "text": message.text()}],
                }));
            }
            Role::Assistant => {
                collecting_results = false;
                let mut blocks = Vec::new();
                let text = message.text();
                if !text.is_empty() {
                    blocks.push(json!({"type": "text", "text": text}));
                }
                for request in message.tool_requests() {
                    blocks.push(json!({
                        "type": "tool_use",
                        "id": request.id,
                        "name": sanitize_function_name(&request.tool_call.name),
                        "input": as_object(request.tool_call.arguments.clone(), "arguments"),
                    }));
                }
                messages_spec.push(json!({"role": "assistant", "content": blocks}));
            }
            Role::Tool => {
                let blocks: Vec<Value> = message
                    .tool_responses()
                    .iter()
                    .map(|response| {
                        let mut block = json!({
                            "type": "tool_result",
                            "tool_use_id": response.id,
                            "content": response.as_model_text(),
                        });
                        if response.is_error() {
                            block["is_error"] = json!(true);
                        }
                        block
                    })
                    .collect();

                if collecting_results {
                    if let Some(content) = messages_spec
                        .last_mut()
                        .and_then(|m| m.get_mut("content"))
                        .and_then(|c| c.as_array_mut())
                    {
                        content.extend(blocks);
                        continue;
                    }
                }
                messages_spec.push(json!({"role": "user", "content": blocks}));
                collecting_results = true;
            }
        }
    }

    messages_spec
}

/// Convert internal Tool format to Anthropic's tool specification
pub fn tools_to_anthropic_spec(tools: &[Tool]) -> ProviderResult<Vec<Value>> {
    check_unique_tool_names(tools)?;

    Ok(tools
        .iter()
        .map(|tool| {
            json!({
                "name": sanitize_function_name(&tool.name),
                "description": tool.description,
                "input_schema": tool.input_schema,
            })
        })
        .collect())
}

/// Convert Anthropic's content blocks to internal Message format
pub fn anthropic_response_to_message(response: &Value) -> ProviderResult<Message> {
    let blocks = response
        .get("content")
        .and_then(|c| c.as_array())
        .ok_or_else(|| {
            ProviderError::MalformedResponse(format!("No content blocks in response: {}", response))
        })?;

    let mut message = Message::assistant();
    let mut call_index = 0;
    for block in blocks {
        match block.get("type").and_then(|t| t.as_str()) {
            Some("text") => {
                if let Some(text) = block.get("text").and_then(|t| t.as_str()) {
                    if !text.is_empty() {
                        message = message.with_text(text);
                    }
                }
            }
            Some("tool_use") => {
                let id = match block["id"].as_str() {
                    Some(id) if !id.is_empty() => id.to_string(),
                    _ => format!("call_{}", call_index),
                };
                call_index += 1;
                let name = block["name"].as_str().unwrap_or_default();
                let input = block.get("input").cloned().unwrap_or_else(|| json!({}));
                message = message.with_tool_request(id, ToolCall::new(name, input));
            }
            // Thinking and other block types carry nothing the loop acts on
            _ => {}
        }
    }

    Ok(message)
}

pub fn get_anthropic_usage(data: &Value) -> Usage {
    let usage = match data.get("usage") {
        Some(usage) => usage,
        None => return Usage::default(),
    };
    let input_tokens = read_token_count(usage, "input_tokens");
    let output_tokens = read_token_count(usage, "output_tokens");
    let total_tokens = match (input_tokens, output_tokens) {
        (Some(input), Some(output)) => Some(input + output),
        _ => None,
    };
    Usage::new(input_tokens, output_tokens, total_tokens)
}
