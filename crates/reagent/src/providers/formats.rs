//! Pure conversions between the internal message model and each provider's wire format.
//!
//! Nothing in here performs I/O: every function maps json to json (or json to
//! [`Message`]) so each adapter can be exercised without a server.
pub mod anthropic;
pub mod google;
pub mod ollama;
pub mod openai;

use crate::models::message::Message;
use crate::models::role::Role;

/// All system message text, joined with blank lines
pub(crate) fn system_text(messages: &[Message]) -> String {
    messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.text())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
