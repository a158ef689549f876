use serde::Serialize;

use super::message::Message;

/// The ordered history sent to the model on every round.
///
/// Append-only: messages are replayed to the provider in exactly the order
/// they were pushed, and nothing is ever removed or rewritten.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// A conversation holding the system instructions followed by the user query
    pub fn seeded(system_prompt: &str, query: &str) -> Self {
        let mut conversation = Self::new();
        conversation.push(Message::system().with_text(system_prompt));
        conversation.push(Message::user().with_text(query));
        conversation
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}
