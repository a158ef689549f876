pub mod anthropic;
pub mod base;
pub mod configs;
pub mod errors;
pub mod factory;
pub mod formats;
pub mod google;
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod utils;
