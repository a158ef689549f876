//! These models represent the objects passed around by the agent
//!
//! There are several different related formats we need to interact with:
//! - openai chat completion messages/tools (also used by huggingface and grok)
//! - anthropic messages/tools
//! - ollama native chat messages/tools
//! - gemini contents/function declarations
//! - tool calls, sent from the agent to the registered tool handlers
//!
//! These all overlap to varying degrees. We always immediately convert those data models
//! into the internal structs using the helpers in `providers::formats`. Because of the need
//! for compatibility, the internal models are not an exact match to any of these formats.
pub mod content;
pub mod conversation;
pub mod message;
pub mod role;
pub mod tool;
