//! Chat: session-scoped Q&A with cached, dual RAG / non-RAG answers.

mod cache;
mod service;
mod types;

pub use cache::{CacheStats, CachedAnswer, ChatCache, DEFAULT_CACHE_CAPACITY};
pub use service::ChatService;
pub use types::{ChatMessageRequest, ChatResponse, ResponseContent, Source, ALL_CHATS};
