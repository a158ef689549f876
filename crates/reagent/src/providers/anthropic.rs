use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{Provider, Usage};
use super::configs::AnthropicProviderConfig;
use super::errors::{ProviderError, ProviderResult};
use super::formats::anthropic::{
    anthropic_response_to_message, get_anthropic_usage, messages_to_anthropic_spec,
    system_to_anthropic_spec, tools_to_anthropic_spec,
};
use super::utils::{handle_response, insert_if_some};
use crate::models::message::Message;
use crate::models::tool::Tool;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The messages api requires an explicit output budget
pub const DEFAULT_MAX_TOKENS: i32 = 1024;

pub struct AnthropicProvider {
    client: Client,
    config: AnthropicProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicProviderConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    async fn post(&self, payload: Value) -> ProviderResult<Value> {
        let url = format!("{}/v1/messages", self.config.host.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload)
            .send()
            .await?;

        handle_response(response).await
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[Tool],
    ) -> ProviderResult<(Message, Usage)> {
        let messages_spec = messages_to_anthropic_spec(messages);
        let tools_spec = tools_to_anthropic_spec(tools)?;

        let mut payload = json!({
            "model": self.config.model,
            "messages": messages_spec,
            "max_tokens": self.config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        });

        insert_if_some(&mut payload, "system", system_to_anthropic_spec(messages));
        if !tools_spec.is_empty() {
            insert_if_some(&mut payload, "tools", Some(tools_spec));
        }
        insert_if_some(&mut payload, "temperature", self.config.temperature);

        let response = self.post(payload).await?;

        if let Some(error) = response.get("error") {
            return Err(ProviderError::Api(error.to_string()));
        }

        let message = anthropic_response_to_message(&response)?;
        let usage = get_anthropic_usage(&response);

        Ok((message, usage))
    }
}
