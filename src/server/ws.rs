//! WebSocket feed for the Drive panel.
//!
//! A client mounts the panel provider for its session over the socket; from
//! then on every state transition is pushed as a `panel_state` snapshot,
//! whichever field changed. Dispatched actions arrive as tagged JSON and go
//! through the same reducer as server-side dispatches; unknown tags are
//! ignored. The provider is unmounted when the socket closes.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::panel::PanelError;
use crate::state::AppState;

pub const WS_APP_PROTOCOL: &str = "docbot.v1";
pub const WS_TOKEN_PREFIX: &str = "docbot-token.";

#[derive(Debug, Deserialize, Default)]
struct WsIncomingMessage {
    #[serde(rename = "type")]
    msg_type: Option<String>,
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
    action: Option<Value>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let origin_ok = validate_origin(&headers, &state);
    let token_ok = validate_token(&headers, &state);

    ws.protocols([WS_APP_PROTOCOL])
        .on_upgrade(move |socket| handle_socket(socket, state, origin_ok, token_ok))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, origin_ok: bool, token_ok: bool) {
    let (mut sender, mut receiver) = socket.split();

    if !origin_ok {
        let _ = sender
            .send(Message::Close(Some(CloseFrame {
                code: 4003,
                reason: "Forbidden: Invalid Origin".into(),
            })))
            .await;
        return;
    }

    if !token_ok {
        let _ = sender
            .send(Message::Close(Some(CloseFrame {
                code: 4001,
                reason: "Unauthorized: Invalid Token".into(),
            })))
            .await;
        return;
    }

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Value>();
    let writer = tokio::spawn(async move {
        while let Some(payload) = out_rx.recv().await {
            let Ok(text) = serde_json::to_string(&payload) else {
                continue;
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // (scope, forwarder task) for the currently mounted panel, if any.
    let mut mounted: Option<(String, JoinHandle<()>)> = None;

    while let Some(Ok(msg)) = receiver.next().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let Ok(incoming) = serde_json::from_str::<WsIncomingMessage>(&text) else {
            continue;
        };

        match incoming.msg_type.as_deref().unwrap_or("") {
            "mount_panel" => {
                let scope = incoming
                    .session_id
                    .unwrap_or_else(|| "default".to_string());

                if let Some((old_scope, task)) = mounted.take() {
                    task.abort();
                    state.panels.unmount(&old_scope);
                }

                let store = state.panels.mount(&scope);
                let _ = out_tx.send(json!({
                    "type": "panel_state",
                    "sessionId": scope,
                    "data": store.state(),
                }));

                let mut updates = store.subscribe();
                let forward_tx = out_tx.clone();
                let forward_scope = scope.clone();
                let task = tokio::spawn(async move {
                    while updates.changed().await.is_ok() {
                        let snapshot = updates.borrow_and_update().clone();
                        let sent = forward_tx.send(json!({
                            "type": "panel_state",
                            "sessionId": forward_scope,
                            "data": snapshot,
                        }));
                        if sent.is_err() {
                            break;
                        }
                    }
                });

                mounted = Some((scope, task));
            }
            "dispatch" => match &mounted {
                Some((scope, _)) => match state.panels.panel(scope) {
                    Ok(store) => {
                        if let Some(action) = &incoming.action {
                            store.dispatch_value(action);
                        }
                    }
                    Err(err) => {
                        let _ = out_tx
                            .send(json!({ "type": "error", "message": err.to_string() }));
                    }
                },
                None => {
                    let _ = out_tx.send(json!({
                        "type": "error",
                        "message": PanelError::MissingProvider.to_string(),
                    }));
                }
            },
            "unmount_panel" => {
                if let Some((scope, task)) = mounted.take() {
                    task.abort();
                    state.panels.unmount(&scope);
                    let _ = out_tx.send(json!({ "type": "panel_unmounted", "sessionId": scope }));
                }
            }
            other => {
                tracing::debug!("Ignoring unknown ws message type: {}", other);
            }
        }
    }

    if let Some((scope, task)) = mounted.take() {
        task.abort();
        state.panels.unmount(&scope);
    }
    drop(out_tx);
    let _ = writer.await;
}

fn validate_origin(headers: &HeaderMap, state: &AppState) -> bool {
    let origin = headers.get("origin").and_then(|v| v.to_str().ok());
    let Some(origin) = origin else {
        // Non-browser clients send no Origin header; only allow outside prod.
        let env = std::env::var("DOCBOT_ENV").unwrap_or_else(|_| "production".to_string());
        return env != "production";
    };

    let config = state.config.load_config().unwrap_or(Value::Null);
    for allowed in super::router::resolve_allowed_origins(&config) {
        if origin == allowed || origin.starts_with(&format!("{}/", allowed)) {
            return true;
        }
    }
    false
}

fn validate_token(headers: &HeaderMap, state: &AppState) -> bool {
    extract_token_from_protocol_header(headers)
        .map(|token| token == state.session_token.value())
        .unwrap_or(false)
}

/// Browsers cannot set arbitrary headers on a WebSocket upgrade, so the token
/// rides in a `docbot-token.<hex>` entry of the subprotocol list.
fn extract_token_from_protocol_header(headers: &HeaderMap) -> Option<String> {
    let protocol_header = headers.get("sec-websocket-protocol")?.to_str().ok()?;
    for item in protocol_header.split(',') {
        let Some(encoded) = item.trim().strip_prefix(WS_TOKEN_PREFIX) else {
            continue;
        };
        if encoded.is_empty() {
            return None;
        }
        let bytes = hex::decode(encoded).ok()?;
        let token = String::from_utf8(bytes).ok()?;
        if !token.is_empty() {
            return Some(token);
        }
    }
    None
}
