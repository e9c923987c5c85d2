use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

use crate::chat::{ChatCache, ChatService, DEFAULT_CACHE_CAPACITY};
use crate::core::config::{AppPaths, ConfigService};
use crate::core::security::{init_session_token, SessionToken};
use crate::drive::DriveClient;
use crate::history::HistoryStore;
use crate::index::{IndexService, SqliteVectorStore, VectorStore};
use crate::llm::{LlmProvider, OpenAiProvider};
use crate::panel::PanelRegistry;

pub mod error;

use error::InitializationError;

const DEFAULT_INDEX_BUILDS_PER_MINUTE: u32 = 6;

/// Global application state shared across all routes and background tasks.
///
/// Holds configuration and paths, the history and vector stores, the LLM
/// provider, the panel provider registry, and the chat/index services built
/// on top of them.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub session_token: SessionToken,
    pub history: HistoryStore,
    pub vector_store: Arc<dyn VectorStore>,
    pub llm: Arc<dyn LlmProvider>,
    pub panels: Arc<PanelRegistry>,
    pub cache: Arc<ChatCache>,
    pub chat: ChatService,
    pub index: IndexService,
    pub index_limiter: Arc<DefaultDirectRateLimiter>,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// Sets up paths and configuration, opens the history and index
    /// databases, and wires the chat and index services.
    pub async fn initialize() -> Result<Arc<Self>, InitializationError> {
        let paths = Arc::new(AppPaths::new());
        let config = ConfigService::new(paths.clone());
        let session_token = init_session_token();

        let config_value = config
            .load_config()
            .map_err(|e| InitializationError::Config(e.into()))?;

        let history = HistoryStore::new(paths.history_db_path.clone())
            .await
            .map_err(|e| InitializationError::History(e.into()))?;

        let vector_store: Arc<dyn VectorStore> = Arc::new(
            SqliteVectorStore::new(paths.as_ref())
                .await
                .map_err(|e| InitializationError::Index(e.into()))?,
        );

        let llm: Arc<dyn LlmProvider> = Arc::new(OpenAiProvider::from_config(&config_value));

        let panels = Arc::new(PanelRegistry::new());

        let cache_capacity = config_value
            .get("chat")
            .and_then(|v| v.get("cache_capacity"))
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .unwrap_or(DEFAULT_CACHE_CAPACITY);
        let cache = Arc::new(ChatCache::new(cache_capacity));

        let chat = ChatService::new(
            history.clone(),
            vector_store.clone(),
            llm.clone(),
            cache.clone(),
            config.clone(),
        );

        let index = IndexService::new(
            DriveClient::new(),
            vector_store.clone(),
            llm.clone(),
            config.clone(),
            panels.clone(),
        );

        let builds_per_minute = config_value
            .get("index")
            .and_then(|v| v.get("builds_per_minute"))
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok())
            .and_then(NonZeroU32::new)
            .unwrap_or_else(|| {
                NonZeroU32::new(DEFAULT_INDEX_BUILDS_PER_MINUTE).unwrap_or(NonZeroU32::MIN)
            });
        let index_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(builds_per_minute)));

        Ok(Arc::new(AppState {
            paths,
            config,
            session_token,
            history,
            vector_store,
            llm,
            panels,
            cache,
            chat,
            index,
            index_limiter,
        }))
    }
}
