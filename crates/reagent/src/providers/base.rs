use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::errors::ProviderResult;
use crate::models::message::Message;
use crate::models::tool::Tool;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }

    /// Add another usage report onto this one, treating missing counts as unknown
    pub fn accumulate(&mut self, other: &Usage) {
        fn add(a: Option<i32>, b: Option<i32>) -> Option<i32> {
            match (a, b) {
                (Some(a), Some(b)) => Some(a + b),
                (a, None) => a,
                (None, b) => b,
            }
        }
        self.input_tokens = add(self.input_tokens, other.input_tokens);
        self.output_tokens = add(self.output_tokens, other.output_tokens);
        self.total_tokens = add(self.total_tokens, other.total_tokens);
    }
}

/// Base trait for AI providers (OpenAI, Anthropic, etc)
///
/// Implementations normalize their native response shape into the internal
/// [`Message`] model before returning, so the agent never branches on provider.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate the next message given the conversation so far and the tools on offer.
    ///
    /// System messages are part of `messages`; each provider moves them to wherever
    /// its API expects instructions.
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[Tool],
    ) -> ProviderResult<(Message, Usage)>;
}
