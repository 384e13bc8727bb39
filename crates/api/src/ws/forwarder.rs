use bson::oid::ObjectId;
use creatorhub_services::chat::{ChatEvent, ChatEventKind, ChatService, Subscription};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use super::registry::ConnectionRegistry;
use crate::routes::{chat::to_chat_response, message::to_message_response};

/// Subscribes to chat lifecycle events and relays them to connected
/// clients. A single task drains the queue so per-chat order is kept.
pub fn spawn(chats: &ChatService, sockets: Arc<ConnectionRegistry>) -> Subscription {
    let (tx, mut rx) = mpsc::unbounded_channel::<(Vec<ObjectId>, Value)>();

    tokio::spawn(async move {
        while let Some((recipients, payload)) = rx.recv().await {
            sockets.deliver(&recipients, &payload).await;
        }
        debug!("Chat event forwarder stopped");
    });

    chats.subscribe(move |event| {
        let _ = tx.send((event.recipients.clone(), event_json(event)));
    })
}

/// Client-facing frame for an engine event.
pub fn event_json(event: &ChatEvent) -> Value {
    let chat_id = event.chat_id.to_hex();
    let data = match &event.kind {
        ChatEventKind::MessageCreated(message) | ChatEventKind::MessageUpdated(message) => {
            json!({ "chat_id": chat_id, "message": to_message_response(message.clone()) })
        }
        ChatEventKind::MessageDeleted { message_id, message } => json!({
            "chat_id": chat_id,
            "message_id": message_id.to_hex(),
            "message": message.clone().map(to_message_response),
        }),
        ChatEventKind::MessagePinned { message_id, pinned } => json!({
            "chat_id": chat_id,
            "message_id": message_id.to_hex(),
            "pinned": pinned,
        }),
        ChatEventKind::ReactionAdded {
            message_id,
            user_id,
            emoji,
        }
        | ChatEventKind::ReactionRemoved {
            message_id,
            user_id,
            emoji,
        } => json!({
            "chat_id": chat_id,
            "message_id": message_id.to_hex(),
            "user_id": user_id.to_hex(),
            "emoji": emoji,
        }),
        ChatEventKind::Typing {
            user_id,
            is_typing,
            expires_at,
        } => json!({
            "chat_id": chat_id,
            "user_id": user_id.to_hex(),
            "is_typing": is_typing,
            "expires_at": expires_at.timestamp_millis(),
        }),
        ChatEventKind::Read {
            message_id,
            user_id,
        } => json!({
            "chat_id": chat_id,
            "message_id": message_id.to_hex(),
            "user_id": user_id.to_hex(),
        }),
        ChatEventKind::ChatUpdated(chat) => {
            json!({ "chat_id": chat_id, "chat": to_chat_response(chat.clone()) })
        }
        ChatEventKind::ChatRemoved => json!({ "chat_id": chat_id }),
    };

    json!({ "type": event.kind.name(), "data": data })
}
