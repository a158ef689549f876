use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextContent {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonContent {
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
/// Output produced by a tool, either free text or structured JSON
pub enum Content {
    Text(TextContent),
    Json(JsonContent),
}

impl Content {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Content::Text(TextContent { text: text.into() })
    }

    pub fn json(value: Value) -> Self {
        Content::Json(JsonContent { value })
    }

    /// Get the text content if this is a TextContent variant
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(&text.text),
            _ => None,
        }
    }

    /// Render the content for providers that only accept text in tool results.
    /// Text is passed through untouched, json is serialized compactly.
    pub fn as_model_text(&self) -> String {
        match self {
            Content::Text(text) => text.text.clone(),
            Content::Json(json) => match &json.value {
                Value::String(s) => s.clone(),
                value => value.to_string(),
            },
        }
    }

    /// Render the content as a json value, wrapping plain text
    pub fn as_model_value(&self) -> Value {
        match self {
            Content::Text(text) => Value::String(text.text.clone()),
            Content::Json(json) => json.value.clone(),
        }
    }
}

impl From<Value> for Content {
    fn from(value: Value) -> Self {
        Content::json(value)
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::text(text)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::text(text)
    }
}
