use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::core::security::require_api_key;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DriveIndexParams {
    pub folder_id: Option<String>,
    pub recursive: Option<bool>,
    pub summarize: Option<bool>,
    /// Panel scope to report progress to; defaults to the shared session.
    pub session_id: Option<String>,
}

pub async fn build_drive_index(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<DriveIndexParams>,
) -> Result<impl IntoResponse, ApiError> {
    require_api_key(&headers, &state.session_token)?;

    state
        .index_limiter
        .check()
        .map_err(|_| ApiError::RateLimited("index build limit reached, retry later".to_string()))?;

    let session = params.session_id.unwrap_or_else(|| "default".to_string());
    let report = state
        .index
        .build_from_drive(
            &session,
            params.folder_id,
            params.recursive.unwrap_or(true),
            params.summarize.unwrap_or(false),
        )
        .await?;

    Ok(Json(report))
}

pub async fn get_index_info(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_api_key(&headers, &state.session_token)?;
    let info = state.index.info().await?;
    Ok(Json(info))
}

pub async fn delete_index(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_api_key(&headers, &state.session_token)?;
    let removed = state.index.delete().await?;
    Ok(Json(json!({ "status": "success", "deleted_chunks": removed })))
}
