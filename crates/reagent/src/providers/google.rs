use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{Provider, Usage};
use super::configs::GoogleProviderConfig;
use super::errors::{ProviderError, ProviderResult};
use super::formats::google::{
    get_google_usage, google_response_to_message, messages_to_google_spec, system_to_google_spec,
    tools_to_google_spec,
};
use super::utils::{handle_response, insert_if_some};
use crate::models::message::Message;
use crate::models::tool::Tool;

pub struct GoogleProvider {
    client: Client,
    config: GoogleProviderConfig,
}

impl GoogleProvider {
    pub fn new(config: GoogleProviderConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    async fn post(&self, payload: Value) -> ProviderResult<Value> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.host.trim_end_matches('/'),
            self.config.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        handle_response(response).await
    }
}

#[async_trait]
impl Provider for GoogleProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[Tool],
    ) -> ProviderResult<(Message, Usage)> {
        let contents = messages_to_google_spec(messages);
        let tools_spec = tools_to_google_spec(tools)?;

        let mut generation_config = json!({});
        insert_if_some(&mut generation_config, "temperature", self.config.temperature);
        insert_if_some(&mut generation_config, "maxOutputTokens", self.config.max_tokens);

        let mut payload = json!({ "contents": contents });
        insert_if_some(
            &mut payload,
            "systemInstruction",
            system_to_google_spec(messages),
        );
        if !tools_spec.is_empty() {
            insert_if_some(&mut payload, "tools", Some(tools_spec));
        }
        if generation_config.as_object().is_some_and(|o| !o.is_empty()) {
            insert_if_some(&mut payload, "generationConfig", Some(generation_config));
        }

        let response = self.post(payload).await?;

        if let Some(error) = response.get("error") {
            return Err(ProviderError::Api(error.to_string()));
        }

        let message = google_response_to_message(&response)?;
        let usage = get_google_usage(&response);

        Ok((message, usage))
    }
}
