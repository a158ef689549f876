//! Ollama's native `/api/chat` format.
//!
//! Ollama does not hand out call identifiers. Requests are given positional ids
//! (`call_0`, `call_1`, ...) when parsed, and results are sent back as `tool`
//! messages tagged with the tool name in request order. With several calls to
//! the same tool in one turn the model can only pair results with requests by
//! that order; nothing in the protocol lets us check it.
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::models::message::Message;
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};
use crate::providers::base::Usage;
use crate::providers::errors::{ProviderError, ProviderResult};
use crate::providers::utils::{
    as_object, check_unique_tool_names, parse_arguments, read_token_count, sanitize_function_name,
    tool_call_list,
};

pub fn messages_to_ollama_spec(messages: &[Message]) -> Vec<Value> {
    let mut messages_spec = Vec::new();
    // Results only carry the id, ollama wants the tool name back
    let mut names_by_id: HashMap<String, String> = HashMap::new();

    for message in messages {
        match message.role {
            Role::System | Role::User => {
                messages_spec.push(json!({
                    "role": message.role,
                    "content": message.text(),
                }));
            }
            Role::Assistant => {
                let mut converted = json!({
                    "role": "assistant",
                    "content": message.text(),
                });
                let requests = message.tool_requests();
                if !requests.is_empty() {
                    let tool_calls: Vec<Value> = requests
                        .iter()
                        .map(|request| {
                            let name = sanitize_function_name(&request.tool_call.name);
                            names_by_id.insert(request.id.clone(), name.clone());
                            json!({
                                "function": {
                                    "name": name,
                                    "arguments": as_object(request.tool_call.arguments.clone(), "arguments"),
                                }
                            })
                        })
                        .collect();
                    converted["tool_calls"] = json!(tool_calls);
                }
                messages_spec.push(converted);
            }
            Role::Tool => {
                for response in message.tool_responses() {
                    let mut converted = json!({
                        "role": "tool",
                        "content": response.as_model_text(),
                    });
                    if let Some(name) = names_by_id.get(&response.id) {
                        converted["tool_name"] = json!(name);
                    }
                    messages_spec.push(converted);
                }
            }
        }
    }

    messages_spec
}

pub fn tools_to_ollama_spec(tools: &[Tool]) -> ProviderResult<Vec<Value>> {
    check_unique_tool_names(tools)?;

    Ok(tools
        .iter()
        .map(|tool| {
            json!({
                "type": "function",
                "function": {
                    "name": sanitize_function_name(&tool.name),
                    "description": tool.description,
                    "parameters": tool.input_schema,
                }
            })
        })
        .collect())
}

pub fn ollama_response_to_message(response: &Value) -> ProviderResult<Message> {
    let original = response
        .get("message")
        .filter(|m| m.is_object())
        .ok_or_else(|| {
            ProviderError::MalformedResponse(format!("No message in response: {}", response))
        })?;

    let mut message = Message::assistant();

    if let Some(text) = original.get("content").and_then(|c| c.as_str()) {
        if !text.is_empty() {
            message = message.with_text(text);
        }
    }

    for (index, tool_call) in tool_call_list(original, "tool_calls")?.iter().enumerate() {
        let id = match tool_call.get("id").and_then(|id| id.as_str()) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => format!("call_{}", index),
        };
        let name = tool_call["function"]["name"].as_str().unwrap_or_default();
        // Smaller models sometimes send the arguments json encoded
        let arguments = match &tool_call["function"]["arguments"] {
            Value::String(raw) => parse_arguments(raw),
            Value::Null => json!({}),
            other => other.clone(),
        };
        message = message.with_tool_request(id, ToolCall::new(name, arguments));
    }

    Ok(message)
}

pub fn get_ollama_usage(data: &Value) -> Usage {
    let input_tokens = read_token_count(data, "prompt_eval_count");
    let output_tokens = read_token_count(data, "eval_count");
    let total_tokens = match (input_tokens, output_tokens) {
        (Some(input), Some(output)) => Some(input + output),
        _ => None,
    };
    Usage::new(input_tokens, output_tokens, total_tokens)
}
