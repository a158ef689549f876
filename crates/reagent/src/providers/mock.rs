use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::models::message::Message;
use crate::models::tool::Tool;
use crate::providers::base::{Provider, Usage};
use crate::providers::errors::ProviderResult;

/// A mock provider that returns pre-configured responses for testing
///
/// Every request it receives is recorded so tests can check exactly what
/// the model was shown on each round.
#[derive(Clone, Default)]
pub struct MockProvider {
    responses: Arc<Mutex<VecDeque<ProviderResult<Message>>>>,
    requests: Arc<Mutex<Vec<Vec<Message>>>>,
    usage: Usage,
    delay: Option<Duration>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new(responses: Vec<Message>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    /// Like [`MockProvider::new`] but some rounds may fail
    pub fn with_results(results: Vec<ProviderResult<Message>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(results.into())),
            ..Default::default()
        }
    }

    /// Report this usage on every call
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }

    /// Sleep before answering each call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// The messages passed to each call so far, oldest first
    pub fn requests(&self) -> Vec<Vec<Message>> {
        lock(&self.requests).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        messages: &[Message],
        _tools: &[Tool],
    ) -> ProviderResult<(Message, Usage)> {
        lock(&self.requests).push(messages.to_vec());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = lock(&self.responses).pop_front();
        match next {
            Some(result) => result.map(|message| (message, self.usage.clone())),
            // Return empty response if no more pre-configured responses
            None => Ok((Message::assistant().with_text(""), self.usage.clone())),
        }
    }
}
