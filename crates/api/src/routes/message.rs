use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use creatorhub_db::models::{ChatMessage, MessageAttachment};
use creatorhub_services::chat::{MessagePatch, NewMessage};
use creatorhub_services::dao::PaginationParams;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Page;
use crate::{
    error::{ApiError, parse_id},
    extractors::auth::AuthUser,
    state::AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMessageRequest {
    #[validate(length(max = 10000))]
    pub content: Option<String>,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub attachments: Vec<MessageAttachment>,
    pub metadata: Option<serde_json::Value>,
    #[validate(range(min = 1, max = 31_536_000))]
    pub expires_in_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMessageRequest {
    #[validate(length(max = 10000))]
    pub content: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub hard: bool,
}

#[derive(Debug, Deserialize)]
pub struct PinRequest {
    pub pinned: bool,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub content: Option<String>,
    pub attachments: Vec<MessageAttachment>,
    pub metadata: Option<serde_json::Value>,
    pub is_edited: bool,
    pub is_deleted: bool,
    pub pinned: bool,
    pub delivered_to: Vec<String>,
    pub read_by: Vec<String>,
    pub reaction_summary: Vec<ReactionSummaryResponse>,
    pub created_at: i64,
    pub updated_at: Option<i64>,
    pub deleted_at: Option<i64>,
    pub expires_at: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ReactionSummaryResponse {
    pub emoji: String,
    pub count: u32,
}

pub fn to_message_response(message: ChatMessage) -> MessageResponse {
    let reaction_summary = message
        .reaction_summary()
        .into_iter()
        .map(|s| ReactionSummaryResponse {
            emoji: s.emoji,
            count: s.count,
        })
        .collect();

    MessageResponse {
        id: message.id.to_hex(),
        chat_id: message.chat_id.to_hex(),
        sender_id: message.sender_id.to_hex(),
        is_edited: message.updated_at.is_some(),
        is_deleted: message.is_deleted(),
        content: message.content,
        attachments: message.attachments,
        metadata: message.metadata,
        pinned: message.pinned,
        delivered_to: message.delivered_to.iter().map(|u| u.to_hex()).collect(),
        read_by: message.read_by.iter().map(|u| u.to_hex()).collect(),
        reaction_summary,
        created_at: message.created_at.timestamp_millis(),
        updated_at: message.updated_at.map(|t| t.timestamp_millis()),
        deleted_at: message.deleted_at.map(|t| t.timestamp_millis()),
        expires_at: message.expires_at.map(|t| t.timestamp_millis()),
    }
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(chat_id): Path<String>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Page<MessageResponse>>, ApiError> {
    let cid = parse_id(&chat_id, "chat_id")?;
    let result = state
        .core
        .chats
        .list_messages(cid, auth.user_id, &params)
        .await?;
    Ok(Json(Page::map(result, to_message_response)))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(chat_id): Path<String>,
    Json(body): Json<CreateMessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    body.validate()?;
    let cid = parse_id(&chat_id, "chat_id")?;

    let message = state
        .core
        .chats
        .send(
            cid,
            auth.user_id,
            NewMessage {
                content: body.content,
                attachments: body.attachments,
                metadata: body.metadata,
                expires_in_secs: body.expires_in_secs,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(to_message_response(message))))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((chat_id, message_id)): Path<(String, String)>,
    Json(body): Json<UpdateMessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    body.validate()?;
    let cid = parse_id(&chat_id, "chat_id")?;
    let mid = parse_id(&message_id, "message_id")?;

    let message = state
        .core
        .chats
        .update(
            cid,
            mid,
            auth.user_id,
            MessagePatch {
                content: body.content,
                metadata: body.metadata,
            },
        )
        .await?;
    Ok(Json(to_message_response(message)))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((chat_id, message_id)): Path<(String, String)>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let cid = parse_id(&chat_id, "chat_id")?;
    let mid = parse_id(&message_id, "message_id")?;

    let remains = state
        .core
        .chats
        .remove(cid, mid, auth.user_id, query.hard)
        .await?;
    Ok(Json(serde_json::json!({
        "deleted": true,
        "message": remains.map(to_message_response),
    })))
}

pub async fn pin(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((chat_id, message_id)): Path<(String, String)>,
    Json(body): Json<PinRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let cid = parse_id(&chat_id, "chat_id")?;
    let mid = parse_id(&message_id, "message_id")?;
    let message = state
        .core
        .chats
        .pin(cid, mid, auth.user_id, body.pinned)
        .await?;
    Ok(Json(to_message_response(message)))
}

pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((chat_id, message_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let cid = parse_id(&chat_id, "chat_id")?;
    let mid = parse_id(&message_id, "message_id")?;
    let first_read = state.core.chats.mark_read(cid, mid, auth.user_id).await?;
    Ok(Json(serde_json::json!({ "first_read": first_read })))
}
