use serde_json::{json, Value};

use crate::models::message::{Message, MessageContent};
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};
use crate::providers::base::Usage;
use crate::providers::errors::{ProviderError, ProviderResult};
use crate::providers::utils::{
    check_unique_tool_names, parse_arguments, read_token_count, sanitize_function_name,
    tool_call_list,
};

/// Convert internal Message format to OpenAI's API message specification
///
/// Every tool result becomes its own `tool` message carrying the `tool_call_id`
/// of the request it answers.
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    let mut messages_spec = Vec::new();

    for message in messages {
        match message.role {
            Role::System | Role::User => {
                messages_spec.push(json!({
                    "role": message.role,
                    "content": message.text(),
                }));
            }
            Role::Assistant => {
                let text = message.text();
                let content = if text.is_empty() {
                    Value::Null
                } else {
                    Value::String(text)
                };
                let mut converted = json!({
                    "role": "assistant",
                    "content": content,
                });

                let tool_calls: Vec<Value> = message
                    .tool_requests()
                    .iter()
                    .map(|request| {
                        json!({
                            "id": request.id,
                            "type": "function",
                            "function": {
                                "name": sanitize_function_name(&request.tool_call.name),
                                "arguments": request.tool_call.arguments_string(),
                            }
                        })
                    })
                    .collect();

                if !tool_calls.is_empty() {
                    converted["tool_calls"] = json!(tool_calls);
                }
                messages_spec.push(converted);
            }
            Role::Tool => {
                for response in message.tool_responses() {
                    // A tool result error is shown as output so the model can interpret the error message
                    messages_spec.push(json!({
                        "role": "tool",
                        "content": response.as_model_text(),
                        "tool_call_id": response.id,
                    }));
                }
            }
        }
    }

    messages_spec
}

/// Convert internal Tool format to OpenAI's API tool specification
pub fn tools_to_openai_spec(tools: &[Tool]) -> ProviderResult<Vec<Value>> {
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

/// Convert OpenAI's API response to internal Message format
pub fn openai_response_to_message(response: &Value) -> ProviderResult<Message> {
    let original = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .filter(|message| message.is_object())
        .ok_or_else(|| {
            ProviderError::MalformedResponse(format!("No message in choices: {}", response))
        })?;

    let mut message = Message::assistant();

    if let Some(text) = original.get("content").and_then(|c| c.as_str()) {
        if !text.is_empty() {
            message = message.with_text(text);
        }
    }

    for (index, tool_call) in tool_call_list(original, "tool_calls")?.iter().enumerate() {
        let id = match tool_call["id"].as_str() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => format!("call_{}", index),
        };
        let function_name = tool_call["function"]["name"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        // Some compatible servers send the arguments already decoded
        let arguments = match &tool_call["function"]["arguments"] {
            Value::String(raw) => parse_arguments(raw),
            Value::Null => json!({}),
            other => other.clone(),
        };

        message = message.with_tool_request(id, ToolCall::new(function_name, arguments));
    }

    Ok(message)
}

pub fn get_openai_usage(data: &Value) -> Usage {
    let usage = match data.get("usage") {
        Some(usage) => usage,
        None => return Usage::default(),
    };

    let input_tokens = read_token_count(usage, "prompt_tokens");
    let output_tokens = read_token_count(usage, "completion_tokens");
    let total_tokens = read_token_count(usage, "total_tokens").or_else(|| {
        match (input_tokens, output_tokens) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        }
    });

    Usage::new(input_tokens, output_tokens, total_tokens)
}
