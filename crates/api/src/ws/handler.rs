use axum::{
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bson::oid::ObjectId;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::registry::WsSink;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub user_id: String,
}

pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Response {
    let user_id = match ObjectId::parse_str(&params.user_id) {
        Ok(id) => id,
        Err(_) => return (StatusCode::BAD_REQUEST, "Invalid user ID").into_response(),
    };

    match state.core.users.get(user_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return (StatusCode::UNAUTHORIZED, "Unknown user").into_response(),
        Err(e) => {
            warn!(?user_id, %e, "User lookup failed on WS upgrade");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: ObjectId) {
    let connection_id = Uuid::new_v4();
    info!(?user_id, %connection_id, "WebSocket connected");

    let (sender, mut receiver) = socket.split();
    let sender: WsSink = Arc::new(Mutex::new(sender));

    state.sockets.register(user_id, connection_id, sender.clone());

    let hello = serde_json::json!({
        "type": "connected",
        "user_id": user_id.to_hex(),
    });
    reply(&sender, &hello).await;

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                handle_client_message(&state, &sender, user_id, connection_id, text.as_str()).await;
            }
            Ok(Message::Ping(data)) => {
                let mut guard = sender.lock().await;
                let _ = guard.send(Message::Pong(data)).await;
            }
            Ok(Message::Close(_)) => break,
            Err(e) => {
                warn!(?user_id, %connection_id, %e, "WebSocket error");
                break;
            }
            _ => {}
        }
    }

    state.sockets.unregister(user_id, connection_id);
    info!(?user_id, %connection_id, "WebSocket disconnected");
}

/// Answers on this socket only.
async fn reply(sink: &WsSink, frame: &serde_json::Value) {
    let _ = sink.lock().await.send(Message::text(frame.to_string())).await;
}

async fn handle_client_message(
    state: &AppState,
    sink: &WsSink,
    user_id: ObjectId,
    connection_id: Uuid,
    text: &str,
) {
    let parsed: serde_json::Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => return,
    };

    let msg_type = parsed.get("type").and_then(|t| t.as_str()).unwrap_or("");
    let data = parsed.get("data");

    debug!(?user_id, %connection_id, msg_type, "WS message received");

    match msg_type {
        "ping" => {
            reply(sink, &serde_json::json!({ "type": "pong" })).await;
        }
        "typing:start" | "typing:stop" => {
            let chat_id = data
                .and_then(|d| d.get("chat_id"))
                .and_then(|c| c.as_str())
                .and_then(|c| ObjectId::parse_str(c).ok());
            if let Some(chat_id) = chat_id {
                let is_typing = msg_type == "typing:start";
                if let Err(e) = state.core.chats.typing(chat_id, user_id, is_typing).await {
                    debug!(?user_id, ?chat_id, %e, "Typing signal rejected");
                }
            }
        }
        _ => {
            debug!(?user_id, msg_type, "Unknown WS message type");
        }
    }
}
