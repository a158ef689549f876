use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{Provider, Usage};
use super::configs::OllamaProviderConfig;
use super::errors::{ProviderError, ProviderResult};
use super::formats::ollama::{
    get_ollama_usage, messages_to_ollama_spec, ollama_response_to_message, tools_to_ollama_spec,
};
use super::utils::{handle_response, insert_if_some};
use crate::models::message::Message;
use crate::models::tool::Tool;

pub struct OllamaProvider {
    client: Client,
    config: OllamaProviderConfig,
}

impl OllamaProvider {
    pub fn new(config: OllamaProviderConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    async fn post(&self, payload: Value) -> ProviderResult<Value> {
        let url = format!("{}/api/chat", self.config.host.trim_end_matches('/'));

        let response = self.client.post(&url).json(&payload).send().await?;

        handle_response(response).await
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[Tool],
    ) -> ProviderResult<(Message, Usage)> {
        let messages_spec = messages_to_ollama_spec(messages);
        let tools_spec = tools_to_ollama_spec(tools)?;

        let mut options = json!({});
        insert_if_some(&mut options, "temperature", self.config.temperature);
        insert_if_some(&mut options, "num_predict", self.config.max_tokens);

        let mut payload = json!({
            "model": self.config.model,
            "messages": messages_spec,
            "stream": false,
        });
        if !tools_spec.is_empty() {
            insert_if_some(&mut payload, "tools", Some(tools_spec));
        }
        if options.as_object().is_some_and(|o| !o.is_empty()) {
            insert_if_some(&mut payload, "options", Some(options));
        }

        let response = self.post(payload).await?;

        if let Some(error) = response.get("error") {
            return Err(ProviderError::Api(error.to_string()));
        }

        let message = ollama_response_to_message(&response)?;
        let usage = get_ollama_usage(&response);

        Ok((message, usage))
    }
}
