use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::core::security::require_api_key;
use crate::state::AppState;

/// Snapshot of the panel state for a session. Fails with the configuration
/// error when no provider is mounted for that scope.
pub async fn get_panel(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require_api_key(&headers, &state.session_token)?;

    let store = state
        .panels
        .panel(&session_id)
        .map_err(|e| ApiError::NotFound(e.to_string()))?;

    Ok(Json(json!({
        "session_id": session_id,
        "state": store.state(),
    })))
}

/// Dispatch a tagged action into a session's panel store.
///
/// Unknown action tags are identity transitions; the (possibly unchanged)
/// state is returned either way.
pub async fn dispatch_panel_action(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    require_api_key(&headers, &state.session_token)?;

    let store = state
        .panels
        .panel(&session_id)
        .map_err(|e| ApiError::NotFound(e.to_string()))?;

    let next = store.dispatch_value(&payload);
    Ok(Json(json!({
        "session_id": session_id,
        "state": next,
    })))
}
