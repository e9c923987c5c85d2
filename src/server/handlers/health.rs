use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "docbot-backend"
    }))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let total_messages = state.history.total_message_count().await.unwrap_or(0);
    let index = state.index.info().await?;
    let cache = state.cache.stats();

    Ok(Json(json!({
        "initialized": true,
        "total_messages": total_messages,
        "index": {
            "chunk_count": index.chunk_count,
            "file_count": index.file_count,
            "embedding_model": index.embedding_model,
        },
        "cache": cache,
    })))
}
