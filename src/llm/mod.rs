//! LLM provider abstraction and the OpenAI-compatible implementation.

mod openai;
mod provider;
mod types;

pub use openai::OpenAiProvider;
pub use provider::LlmProvider;
pub use types::{ChatMessage, ChatRequest};

use serde_json::Value;

pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Chat model id from config, with the stock default.
pub fn chat_model(config: &Value) -> String {
    config
        .get("llm")
        .and_then(|v| v.get("chat_model"))
        .and_then(|v| v.as_str())
        .unwrap_or(DEFAULT_CHAT_MODEL)
        .to_string()
}

/// Embedding model id from config, with the stock default.
pub fn embedding_model(config: &Value) -> String {
    config
        .get("llm")
        .and_then(|v| v.get("embedding_model"))
        .and_then(|v| v.as_str())
        .unwrap_or(DEFAULT_EMBEDDING_MODEL)
        .to_string()
}
