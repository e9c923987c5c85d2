//! Abstract interface for the document index backend.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

/// A stored document chunk with its source metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocChunk {
    /// Unique chunk identifier.
    pub chunk_id: String,
    /// The text content of the chunk.
    pub content: String,
    /// Drive file id this chunk came from.
    pub file_id: String,
    /// Display name of the source file.
    pub file_name: String,
    /// File-type label ("document", "pdf", ...).
    pub file_type: String,
    /// Optional metadata (JSON), e.g. chunk offsets or a view URL.
    pub metadata: Option<serde_json::Value>,
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSearchResult {
    pub chunk: DocChunk,
    /// Cosine similarity (higher = better).
    pub score: f32,
}

/// Abstract trait for the vector index backend.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert chunks with their embedding vectors in one batch.
    async fn insert_batch(&self, items: Vec<(DocChunk, Vec<f32>)>) -> Result<(), ApiError>;

    /// Chunks most similar to the query embedding, best first.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, ApiError>;

    /// Total stored chunk count.
    async fn chunk_count(&self) -> Result<usize, ApiError>;

    /// Number of distinct indexed files.
    async fn file_count(&self) -> Result<usize, ApiError>;

    /// Distinct-file counts per file-type label.
    async fn file_type_counts(&self) -> Result<BTreeMap<String, u64>, ApiError>;

    /// Drop every stored chunk. Returns how many were removed.
    async fn clear(&self) -> Result<usize, ApiError>;

    /// Embedding model the current index was built with, if recorded.
    async fn embedding_model(&self) -> Result<Option<String>, ApiError>;

    /// Record the embedding model for the current index contents.
    async fn set_embedding_model(&self, model: &str) -> Result<(), ApiError>;
}
