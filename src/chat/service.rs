//! Chat pipeline: history, cache, retrieval, and dual RAG / non-RAG answers.

use std::sync::Arc;

use serde_json::{json, Value};

use super::cache::{CachedAnswer, ChatCache};
use super::types::{ChatMessageRequest, ChatResponse, ResponseContent, Source, ALL_CHATS};
use crate::core::config::ConfigService;
use crate::core::errors::ApiError;
use crate::history::{HistoryMessage, HistoryStore};
use crate::index::{ChunkSearchResult, VectorStore};
use crate::llm::{self, ChatMessage, ChatRequest, LlmProvider};

const DEFAULT_HISTORY_LIMIT: i64 = 20;
const DEFAULT_TOP_K: usize = 4;

const RAG_SYSTEM_PROMPT: &str = "You are a documentation assistant. Answer using the provided \
context excerpts; when the context does not cover the question, say so instead of guessing.";
const PLAIN_SYSTEM_PROMPT: &str = "You are a documentation assistant. Answer from general \
knowledge.";

#[derive(Clone)]
pub struct ChatService {
    history: HistoryStore,
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LlmProvider>,
    cache: Arc<ChatCache>,
    config: ConfigService,
}

impl ChatService {
    pub fn new(
        history: HistoryStore,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn LlmProvider>,
        cache: Arc<ChatCache>,
        config: ConfigService,
    ) -> Self {
        Self {
            history,
            store,
            llm,
            cache,
            config,
        }
    }

    /// Answer a chat message, consulting the cache first.
    ///
    /// On a miss the reply is produced twice: once grounded on retrieved
    /// context and once without it, so the frontend can show both.
    pub async fn chat(&self, request: ChatMessageRequest) -> Result<ChatResponse, ApiError> {
        if request.message.trim().is_empty() {
            return Err(ApiError::BadRequest("message must not be empty".to_string()));
        }

        let config = self.config.load_config()?;
        let history_limit = config
            .get("chat")
            .and_then(|v| v.get("history_limit"))
            .and_then(Value::as_i64)
            .unwrap_or(DEFAULT_HISTORY_LIMIT);

        let prior = self
            .history
            .get_history(&request.session_id, history_limit)
            .await?;
        let key = ChatCache::query_hash(&request.session_id, &request.message, &prior);

        if let Some(answer) = self.cache.get(&key) {
            tracing::info!(
                "Chat cache hit: session={}, key={}",
                request.session_id,
                &key[..16]
            );
            return self.finish(&request, answer, true).await;
        }

        tracing::info!(
            "Chat cache miss: session={}, input_length={}",
            request.session_id,
            request.message.len()
        );

        let (context, sources) = self.retrieve(&config, &request.message).await?;
        let chat_model = llm::chat_model(&config);

        let rag_request = ChatRequest::new(build_messages(
            RAG_SYSTEM_PROMPT,
            context.as_deref(),
            &prior,
            &request.message,
        ))
        .with_config(&config);
        let rag_output = self.llm.chat(rag_request, &chat_model).await?;

        let dual_response = config
            .get("chat")
            .and_then(|v| v.get("dual_response"))
            .and_then(Value::as_bool)
            .unwrap_or(true);
        let no_rag_output = if dual_response {
            let plain_request = ChatRequest::new(build_messages(
                PLAIN_SYSTEM_PROMPT,
                None,
                &prior,
                &request.message,
            ))
            .with_config(&config);
            Some(self.llm.chat(plain_request, &chat_model).await?)
        } else {
            None
        };

        let answer = CachedAnswer {
            rag_output,
            no_rag_output,
            sources,
        };
        self.cache.insert(key, answer.clone());

        self.finish(&request, answer, false).await
    }

    /// Append the turn to history and assemble the response payload.
    async fn finish(
        &self,
        request: &ChatMessageRequest,
        answer: CachedAnswer,
        cached: bool,
    ) -> Result<ChatResponse, ApiError> {
        let timestamp = chrono::Utc::now().to_rfc3339();
        self.history
            .add_message(
                &request.session_id,
                "human",
                &request.message,
                Some(json!({ "timestamp": timestamp })),
            )
            .await?;
        self.history
            .add_message(
                &request.session_id,
                "ai",
                &answer.rag_output,
                Some(json!({ "timestamp": timestamp, "cached": cached })),
            )
            .await?;

        let messages = self.history.get_history(&request.session_id, 0).await?;

        Ok(ChatResponse {
            response: ResponseContent {
                input: request.message.clone(),
                history: format_history(&messages),
                output: answer.rag_output,
                no_rag_output: answer.no_rag_output,
            },
            sources: answer.sources,
            cached,
        })
    }

    /// Top-k retrieval over the document index, as a prompt context block.
    async fn retrieve(
        &self,
        config: &Value,
        query: &str,
    ) -> Result<(Option<String>, Vec<Source>), ApiError> {
        let top_k = config
            .get("rag")
            .and_then(|v| v.get("top_k"))
            .and_then(Value::as_u64)
            .map(|v| v as usize)
            .unwrap_or(DEFAULT_TOP_K);

        let embeddings = self
            .llm
            .embed(&[query.to_string()], &llm::embedding_model(config))
            .await?;
        let Some(query_embedding) = embeddings.into_iter().next() else {
            return Ok((None, Vec::new()));
        };

        let results = self.store.search(&query_embedding, top_k).await?;
        if results.is_empty() {
            return Ok((None, Vec::new()));
        }

        let context = build_context(&results);
        let sources = format_sources(&results);
        Ok((Some(context), sources))
    }

    /// Delete one session's history, or everything for [`ALL_CHATS`].
    pub async fn delete_chat(&self, session_id: &str) -> Result<bool, ApiError> {
        if session_id == ALL_CHATS {
            self.history.delete_all_sessions().await?;
            return Ok(true);
        }
        self.history.delete_session(session_id).await
    }

    /// One session's history keyed by id, or every session for [`ALL_CHATS`].
    pub async fn get_chat(&self, session_id: &str) -> Result<Value, ApiError> {
        if session_id == ALL_CHATS {
            let mut all = serde_json::Map::new();
            for session in self.history.list_sessions().await? {
                let messages = self.history.get_history(&session.id, 0).await?;
                all.insert(session.id.clone(), json!(format_history(&messages)));
            }
            return Ok(Value::Object(all));
        }

        let messages = self.history.get_history(session_id, 0).await?;
        if messages.is_empty() && self.history.get_session(session_id).await?.is_none() {
            return Err(ApiError::NotFound("Session not found".to_string()));
        }
        Ok(json!({ session_id: format_history(&messages) }))
    }
}

fn build_messages(
    system_prompt: &str,
    context: Option<&str>,
    history: &[HistoryMessage],
    input: &str,
) -> Vec<ChatMessage> {
    let system = match context {
        Some(context) => format!("{}\n\nContext:\n{}", system_prompt, context),
        None => system_prompt.to_string(),
    };

    let mut messages = vec![ChatMessage::system(system)];
    for message in history {
        match message.role.as_str() {
            "ai" => messages.push(ChatMessage::assistant(message.content.clone())),
            "system" => {}
            _ => messages.push(ChatMessage::user(message.content.clone())),
        }
    }
    messages.push(ChatMessage::user(input));
    messages
}

fn build_context(results: &[ChunkSearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, result)| format!("[{}] {}\n{}", i + 1, result.chunk.file_name, result.chunk.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_sources(results: &[ChunkSearchResult]) -> Vec<Source> {
    results
        .iter()
        .map(|result| {
            let url = result
                .chunk
                .metadata
                .as_ref()
                .and_then(|m| m.get("url"))
                .and_then(Value::as_str)
                .map(String::from);
            Source {
                title: Some(result.chunk.file_name.clone()).filter(|t| !t.is_empty()),
                url,
                content: result.chunk.content.clone(),
            }
        })
        .collect()
}

fn format_history(messages: &[HistoryMessage]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| {
            let role = match message.role.as_str() {
                "ai" => "assistant",
                "system" => "system",
                _ => "user",
            };
            let timestamp = message
                .additional_kwargs
                .as_ref()
                .and_then(|k| k.get("timestamp"))
                .and_then(Value::as_str)
                .unwrap_or(&message.created_at);
            json!({
                "role": role,
                "content": message.content,
                "timestamp": timestamp,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{DocChunk, SqliteVectorStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockLlm {
        chat_calls: AtomicUsize,
        embed_calls: AtomicUsize,
    }

    impl MockLlm {
        fn new() -> Self {
            Self {
                chat_calls: AtomicUsize::new(0),
                embed_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for MockLlm {
        fn name(&self) -> &str {
            "mock"
        }

        async fn health_check(&self) -> Result<bool, ApiError> {
            Ok(true)
        }

        async fn chat(&self, request: ChatRequest, _model_id: &str) -> Result<String, ApiError> {
            self.chat_calls.fetch_add(1, Ordering::SeqCst);
            let grounded = request.messages[0].content.contains("Context:");
            Ok(if grounded {
                "grounded answer".to_string()
            } else {
                "plain answer".to_string()
            })
        }

        async fn embed(
            &self,
            inputs: &[String],
            _model_id: &str,
        ) -> Result<Vec<Vec<f32>>, ApiError> {
            self.embed_calls.fetch_add(1, Ordering::SeqCst);
            Ok(inputs.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
        }
    }

    async fn test_service(llm: Arc<MockLlm>) -> (ChatService, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();

        let history = HistoryStore::new(dir.path().join("chat.db")).await.unwrap();
        let store = Arc::new(
            SqliteVectorStore::with_path(dir.path().join("index.db"))
                .await
                .unwrap(),
        );
        let paths = Arc::new(crate::core::config::AppPaths {
            project_root: dir.path().to_path_buf(),
            user_data_dir: dir.path().to_path_buf(),
            log_dir: dir.path().join("logs"),
            history_db_path: dir.path().join("chat.db"),
            index_db_path: dir.path().join("index.db"),
            secrets_path: dir.path().join("secrets.yml"),
        });
        let config = ConfigService::new(paths);
        let cache = Arc::new(ChatCache::new(16));

        let service = ChatService::new(history, store.clone(), llm, cache, config);

        store
            .insert_batch(vec![(
                DocChunk {
                    chunk_id: "f1:0".to_string(),
                    content: "Rust is a systems language.".to_string(),
                    file_id: "f1".to_string(),
                    file_name: "rust.txt".to_string(),
                    file_type: "text".to_string(),
                    metadata: Some(json!({ "url": "https://drive.google.com/file/d/f1/view" })),
                },
                vec![1.0, 0.0, 0.0],
            )])
            .await
            .unwrap();

        (service, dir)
    }

    #[tokio::test]
    async fn chat_produces_dual_answers_with_sources() {
        let llm = Arc::new(MockLlm::new());
        let (service, _dir) = test_service(llm.clone()).await;

        let response = service
            .chat(ChatMessageRequest {
                message: "what is rust?".to_string(),
                session_id: "s1".to_string(),
            })
            .await
            .unwrap();

        assert!(!response.cached);
        assert_eq!(response.response.output, "grounded answer");
        assert_eq!(response.response.no_rag_output.as_deref(), Some("plain answer"));
        assert_eq!(response.sources.len(), 1);
        assert_eq!(response.sources[0].title.as_deref(), Some("rust.txt"));
        assert_eq!(response.response.history.len(), 2);
    }

    #[tokio::test]
    async fn repeat_query_hits_cache_only_with_identical_history() {
        let llm = Arc::new(MockLlm::new());
        let (service, _dir) = test_service(llm.clone()).await;

        let request = ChatMessageRequest {
            message: "what is rust?".to_string(),
            session_id: "s1".to_string(),
        };

        let first = service.chat(request.clone()).await.unwrap();
        assert!(!first.cached);
        let calls_after_first = llm.chat_calls.load(Ordering::SeqCst);

        // The turn above changed the history, so the key differs: miss again.
        let second = service.chat(request.clone()).await.unwrap();
        assert!(!second.cached);
        assert!(llm.chat_calls.load(Ordering::SeqCst) > calls_after_first);

        // With the history reset the original key recurs and the answer is
        // served from cache without touching the model.
        service.delete_chat("s1").await.unwrap();
        let calls_before_hit = llm.chat_calls.load(Ordering::SeqCst);
        let third = service.chat(request).await.unwrap();
        assert!(third.cached);
        assert_eq!(third.response.output, "grounded answer");
        assert_eq!(llm.chat_calls.load(Ordering::SeqCst), calls_before_hit);
    }

    #[tokio::test]
    async fn rejects_empty_messages() {
        let llm = Arc::new(MockLlm::new());
        let (service, _dir) = test_service(llm).await;

        let result = service
            .chat(ChatMessageRequest {
                message: "   ".to_string(),
                session_id: "s1".to_string(),
            })
            .await;

        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn delete_chat_supports_the_all_sentinel() {
        let llm = Arc::new(MockLlm::new());
        let (service, _dir) = test_service(llm).await;

        service
            .chat(ChatMessageRequest {
                message: "hello".to_string(),
                session_id: "s1".to_string(),
            })
            .await
            .unwrap();

        assert!(service.delete_chat(ALL_CHATS).await.unwrap());
        assert!(matches!(
            service.get_chat("s1").await,
            Err(ApiError::NotFound(_))
        ));
    }
}
