use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{Provider, Usage};
use super::configs::OpenAiProviderConfig;
use super::errors::{ProviderError, ProviderResult};
use super::formats::openai::{
    get_openai_usage, messages_to_openai_spec, openai_response_to_message, tools_to_openai_spec,
};
use super::utils::{check_openai_context_length_error, handle_response, insert_if_some};
use crate::models::message::Message;
use crate::models::tool::Tool;

pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    async fn post(&self, payload: Value) -> ProviderResult<Value> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&payload)
            .send()
            .await?;

        handle_response(response).await
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[Tool],
    ) -> ProviderResult<(Message, Usage)> {
        let messages_spec = messages_to_openai_spec(messages);
        let tools_spec = tools_to_openai_spec(tools)?;

        let mut payload = json!({
            "model": self.config.model,
            "messages": messages_spec,
        });

        if !tools_spec.is_empty() {
            insert_if_some(&mut payload, "tools", Some(tools_spec));
            insert_if_some(&mut payload, "tool_choice", Some("auto"));
        }
        insert_if_some(&mut payload, "temperature", self.config.temperature);
        insert_if_some(&mut payload, "max_tokens", self.config.max_tokens);

        let response = self.post(payload).await?;

        // Raise specific error if context length is exceeded
        if let Some(error) = response.get("error") {
            if let Some(err) = check_openai_context_length_error(error) {
                return Err(err);
            }
            return Err(ProviderError::Api(error.to_string()));
        }

        let message = openai_response_to_message(&response)?;
        let usage = get_openai_usage(&response);

        Ok((message, usage))
    }
}
