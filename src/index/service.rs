//! Index build pipeline: Drive listing to chunks, embeddings, vector store.
//!
//! While a build runs, the session's panel store (when one is mounted) is
//! driven through the panel action vocabulary so connected UIs can follow
//! progress. A missing panel provider is not an error for the pipeline.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};

use super::chunker::{Chunker, ChunkerConfig};
use super::store::{DocChunk, VectorStore};
use crate::core::config::ConfigService;
use crate::core::errors::ApiError;
use crate::drive::{DriveClient, DriveFile};
use crate::llm::{self, ChatMessage, ChatRequest, LlmProvider};
use crate::panel::{IndexStats, PanelAction, PanelRegistry, PanelStore};

/// Characters of document text handed to the summarizer at most.
const SUMMARIZE_INPUT_LIMIT: usize = 8000;

#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    pub status: String,
    pub folder_id: String,
    pub files_indexed: usize,
    pub files_skipped: usize,
    pub chunks_indexed: usize,
    pub file_types: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexInfo {
    pub status: String,
    pub chunk_count: usize,
    pub file_count: usize,
    pub file_types: BTreeMap<String, u64>,
    pub embedding_model: Option<String>,
}

#[derive(Clone)]
pub struct IndexService {
    drive: DriveClient,
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LlmProvider>,
    config: ConfigService,
    panels: Arc<PanelRegistry>,
}

impl IndexService {
    pub fn new(
        drive: DriveClient,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn LlmProvider>,
        config: ConfigService,
        panels: Arc<PanelRegistry>,
    ) -> Self {
        Self {
            drive,
            store,
            llm,
            config,
            panels,
        }
    }

    /// Build the index from a Drive folder.
    ///
    /// `session_scope` selects the panel provider to drive; `folder_id` falls
    /// back to `google_drive.folder_id` in config, then to the Drive root.
    pub async fn build_from_drive(
        &self,
        session_scope: &str,
        folder_id: Option<String>,
        recursive: bool,
        summarize: bool,
    ) -> Result<IndexReport, ApiError> {
        let panel = self.panels.panel(session_scope).ok();
        let config = self.config.load_config()?;

        let access_token = drive_access_token(&config)?;
        let folder = folder_id
            .or_else(|| {
                config
                    .get("google_drive")
                    .and_then(|v| v.get("folder_id"))
                    .and_then(|v| v.as_str())
                    .map(String::from)
            })
            .unwrap_or_else(|| "root".to_string());

        dispatch(&panel, PanelAction::SetFolderId {
            folder_id: folder.clone(),
        });
        dispatch(&panel, PanelAction::SetIndexing { value: true });
        dispatch(&panel, PanelAction::SetError { message: None });
        dispatch(&panel, PanelAction::SetSuccess { message: None });

        let result = self
            .run_build(&panel, &config, &access_token, &folder, recursive, summarize)
            .await;

        match &result {
            Ok(report) => {
                dispatch(&panel, PanelAction::SetSuccess {
                    message: Some(format!(
                        "Indexed {} files ({} chunks) from folder {}",
                        report.files_indexed, report.chunks_indexed, report.folder_id
                    )),
                });
            }
            Err(err) => {
                dispatch(&panel, PanelAction::SetError {
                    message: Some(err.to_string()),
                });
            }
        }
        dispatch(&panel, PanelAction::SetIndexing { value: false });

        result
    }

    async fn run_build(
        &self,
        panel: &Option<Arc<PanelStore>>,
        config: &Value,
        access_token: &str,
        folder: &str,
        recursive: bool,
        summarize: bool,
    ) -> Result<IndexReport, ApiError> {
        dispatch(panel, PanelAction::SetLoading { value: true });
        let listing = self.drive.list_folder(access_token, folder, recursive).await;
        dispatch(panel, PanelAction::SetLoading { value: false });
        let files = listing?;

        let stats = IndexStats::from_files(&files);
        dispatch(panel, PanelAction::SetFiles {
            files: files.clone(),
        });
        dispatch(panel, PanelAction::SetStats {
            stats: stats.clone(),
        });

        let chunker = Chunker::new(ChunkerConfig::from_config(config));
        let embedding_model = llm::embedding_model(config);

        let mut files_indexed = 0;
        let mut files_skipped = 0;
        let mut chunks_indexed = 0;

        for file in &files {
            match self
                .index_file(config, access_token, &chunker, &embedding_model, file, summarize)
                .await
            {
                Ok(0) => files_skipped += 1,
                Ok(chunk_count) => {
                    files_indexed += 1;
                    chunks_indexed += chunk_count;
                }
                Err(err) => {
                    tracing::warn!("Skipping {} ({}): {}", file.name, file.id, err);
                    files_skipped += 1;
                }
            }
        }

        self.store.set_embedding_model(&embedding_model).await?;

        tracing::info!(
            "Index build finished: {} files, {} chunks, {} skipped",
            files_indexed,
            chunks_indexed,
            files_skipped
        );

        Ok(IndexReport {
            status: "success".to_string(),
            folder_id: folder.to_string(),
            files_indexed,
            files_skipped,
            chunks_indexed,
            file_types: stats.file_types,
        })
    }

    /// Index one file; returns the number of chunks stored (0 = no text).
    async fn index_file(
        &self,
        config: &Value,
        access_token: &str,
        chunker: &Chunker,
        embedding_model: &str,
        file: &DriveFile,
        summarize: bool,
    ) -> Result<usize, ApiError> {
        let Some(text) = self.drive.fetch_text(access_token, file).await? else {
            tracing::debug!("No text rendition for {} ({})", file.name, file.mime_type);
            return Ok(0);
        };

        let content = if summarize {
            self.summarize(config, &file.name, &text).await?
        } else {
            text
        };

        let chunks = chunker.split(&content);
        if chunks.is_empty() {
            return Ok(0);
        }

        let inputs: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.llm.embed(&inputs, embedding_model).await?;

        let items: Vec<(DocChunk, Vec<f32>)> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                let doc = DocChunk {
                    // Deterministic id so a rebuild replaces instead of duplicating.
                    chunk_id: format!("{}:{}", file.id, chunk.chunk_index),
                    content: chunk.text.clone(),
                    file_id: file.id.clone(),
                    file_name: file.name.clone(),
                    file_type: file.type_label().to_string(),
                    metadata: Some(json!({
                        "start_offset": chunk.start_offset,
                        "url": file.view_url(),
                        "summarized": summarize,
                    })),
                };
                (doc, embedding)
            })
            .collect();

        let stored = items.len();
        self.store.insert_batch(items).await?;
        Ok(stored)
    }

    async fn summarize(
        &self,
        config: &Value,
        file_name: &str,
        text: &str,
    ) -> Result<String, ApiError> {
        let clipped: String = text.chars().take(SUMMARIZE_INPUT_LIMIT).collect();
        let request = ChatRequest::new(vec![
            ChatMessage::system(
                "Summarize the document for a knowledge base. Keep every concrete fact, \
                 name, and figure; drop filler.",
            ),
            ChatMessage::user(format!("Document \"{}\":\n\n{}", file_name, clipped)),
        ])
        .with_config(config);

        self.llm.chat(request, &llm::chat_model(config)).await
    }

    /// Statistics about the current index contents.
    pub async fn info(&self) -> Result<IndexInfo, ApiError> {
        Ok(IndexInfo {
            status: "success".to_string(),
            chunk_count: self.store.chunk_count().await?,
            file_count: self.store.file_count().await?,
            file_types: self.store.file_type_counts().await?,
            embedding_model: self.store.embedding_model().await?,
        })
    }

    /// Drop the entire index. Returns how many chunks were removed.
    pub async fn delete(&self) -> Result<usize, ApiError> {
        let removed = self.store.clear().await?;
        tracing::info!("Index deleted ({} chunks removed)", removed);
        Ok(removed)
    }
}

fn dispatch(panel: &Option<Arc<PanelStore>>, action: PanelAction) {
    if let Some(store) = panel {
        store.dispatch(&action);
    }
}

fn drive_access_token(config: &Value) -> Result<String, ApiError> {
    config
        .get("google_drive")
        .and_then(|v| v.get("access_token"))
        .and_then(|v| v.as_str())
        .filter(|token| !token.trim().is_empty())
        .map(String::from)
        .ok_or_else(|| {
            ApiError::BadRequest("google_drive.access_token is not configured".to_string())
        })
}
