//! SQLite-backed vector store.
//!
//! In-process index using SQLite for chunk storage and brute-force cosine
//! similarity for search. Embeddings are stored as little-endian f32 blobs.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{ChunkSearchResult, DocChunk, VectorStore};
use crate::core::config::AppPaths;
use crate::core::errors::ApiError;

pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    pub async fn new(paths: &AppPaths) -> Result<Self, ApiError> {
        Self::with_path(paths.index_db_path.clone()).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS doc_chunks (
                chunk_id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                file_id TEXT NOT NULL DEFAULT '',
                file_name TEXT NOT NULL DEFAULT '',
                file_type TEXT NOT NULL DEFAULT 'other',
                metadata TEXT DEFAULT '{}',
                embedding BLOB,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_file ON doc_chunks(file_id)")
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }

    fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> DocChunk {
        let metadata_str: String = row.get("metadata");
        let metadata = serde_json::from_str::<Value>(&metadata_str).ok();

        DocChunk {
            chunk_id: row.get("chunk_id"),
            content: row.get("content"),
            file_id: row.get("file_id"),
            file_name: row.get("file_name"),
            file_type: row.get("file_type"),
            metadata,
        }
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn insert_batch(&self, items: Vec<(DocChunk, Vec<f32>)>) -> Result<(), ApiError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        for (chunk, embedding) in &items {
            let blob = Self::serialize_embedding(embedding);
            let metadata_str = chunk
                .metadata
                .as_ref()
                .map(|m| serde_json::to_string(m).unwrap_or_default())
                .unwrap_or_else(|| "{}".to_string());

            sqlx::query(
                "INSERT OR REPLACE INTO doc_chunks \
                 (chunk_id, content, file_id, file_name, file_type, metadata, embedding) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .bind(&chunk.chunk_id)
            .bind(&chunk.content)
            .bind(&chunk.file_id)
            .bind(&chunk.file_name)
            .bind(&chunk.file_type)
            .bind(&metadata_str)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;
        }

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, ApiError> {
        let rows = sqlx::query(
            "SELECT chunk_id, content, file_id, file_name, file_type, metadata, embedding \
             FROM doc_chunks",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        let mut scored: Vec<ChunkSearchResult> = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                if embedding_bytes.is_empty() {
                    return None;
                }
                let stored = Self::deserialize_embedding(&embedding_bytes);
                let score = Self::cosine_similarity(query_embedding, &stored);

                Some(ChunkSearchResult {
                    chunk: Self::row_to_chunk(row),
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit.max(1));

        Ok(scored)
    }

    async fn chunk_count(&self) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM doc_chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(count as usize)
    }

    async fn file_count(&self) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT file_id) FROM doc_chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(count as usize)
    }

    async fn file_type_counts(&self) -> Result<BTreeMap<String, u64>, ApiError> {
        let rows = sqlx::query(
            "SELECT file_type, COUNT(DISTINCT file_id) as file_count \
             FROM doc_chunks GROUP BY file_type",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(rows
            .iter()
            .map(|row| {
                let label: String = row.get("file_type");
                let count: i64 = row.get("file_count");
                (label, count as u64)
            })
            .collect())
    }

    async fn clear(&self) -> Result<usize, ApiError> {
        let result = sqlx::query("DELETE FROM doc_chunks")
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        sqlx::query("DELETE FROM index_meta WHERE key = 'embedding_model'")
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(result.rows_affected() as usize)
    }

    async fn embedding_model(&self) -> Result<Option<String>, ApiError> {
        let model: Option<String> =
            sqlx::query_scalar("SELECT value FROM index_meta WHERE key = 'embedding_model'")
                .fetch_optional(&self.pool)
                .await
                .map_err(ApiError::internal)?;
        Ok(model)
    }

    async fn set_embedding_model(&self, model: &str) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT OR REPLACE INTO index_meta (key, value, updated_at) \
             VALUES ('embedding_model', ?1, STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))",
        )
        .bind(model)
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SqliteVectorStore {
        let tmp = std::env::temp_dir().join(format!("docbot-index-test-{}.db", uuid::Uuid::new_v4()));
        SqliteVectorStore::with_path(tmp).await.unwrap()
    }

    fn make_chunk(id: &str, content: &str, file_id: &str, file_type: &str) -> DocChunk {
        DocChunk {
            chunk_id: id.to_string(),
            content: content.to_string(),
            file_id: file_id.to_string(),
            file_name: format!("{file_id}.txt"),
            file_type: file_type.to_string(),
            metadata: Some(serde_json::json!({ "start_offset": 0 })),
        }
    }

    #[tokio::test]
    async fn insert_and_search_ranks_by_cosine() {
        let store = test_store().await;

        store
            .insert_batch(vec![
                (make_chunk("c1", "alpha", "f1", "text"), vec![1.0, 0.0, 0.0]),
                (make_chunk("c2", "beta", "f1", "text"), vec![0.0, 1.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = store.search(&[0.9, 0.1, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.chunk_id, "c1");
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn counts_distinct_files_per_type() {
        let store = test_store().await;

        store
            .insert_batch(vec![
                (make_chunk("c1", "a", "f1", "document"), vec![1.0]),
                (make_chunk("c2", "b", "f1", "document"), vec![1.0]),
                (make_chunk("c3", "c", "f2", "pdf"), vec![1.0]),
            ])
            .await
            .unwrap();

        assert_eq!(store.chunk_count().await.unwrap(), 3);
        assert_eq!(store.file_count().await.unwrap(), 2);

        let by_type = store.file_type_counts().await.unwrap();
        assert_eq!(by_type.get("document"), Some(&1));
        assert_eq!(by_type.get("pdf"), Some(&1));
    }

    #[tokio::test]
    async fn clear_drops_chunks_and_model_marker() {
        let store = test_store().await;

        store
            .insert_batch(vec![(make_chunk("c1", "a", "f1", "text"), vec![1.0])])
            .await
            .unwrap();
        store.set_embedding_model("embed-v1").await.unwrap();
        assert_eq!(
            store.embedding_model().await.unwrap().as_deref(),
            Some("embed-v1")
        );

        let removed = store.clear().await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.chunk_count().await.unwrap(), 0);
        assert_eq!(store.embedding_model().await.unwrap(), None);
    }

    #[tokio::test]
    async fn reinserting_a_chunk_id_replaces_it() {
        let store = test_store().await;

        store
            .insert_batch(vec![(make_chunk("c1", "old", "f1", "text"), vec![1.0])])
            .await
            .unwrap();
        store
            .insert_batch(vec![(make_chunk("c1", "new", "f1", "text"), vec![1.0])])
            .await
            .unwrap();

        assert_eq!(store.chunk_count().await.unwrap(), 1);
        let results = store.search(&[1.0], 1).await.unwrap();
        assert_eq!(results[0].chunk.content, "new");
    }
}
