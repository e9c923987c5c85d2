use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sentinel session id addressing every session at once.
pub const ALL_CHATS: &str = "ALL_CHATS";

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessageRequest {
    pub message: String,
    pub session_id: String,
}

/// A document excerpt the answer was grounded on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseContent {
    pub input: String,
    pub history: Vec<Value>,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_rag_output: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub response: ResponseContent,
    pub sources: Vec<Source>,
    pub cached: bool,
}
