use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use creatorhub_db::models::Chat;
use creatorhub_services::chat::ChatRemoval;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    error::{ApiError, parse_id},
    extractors::auth::AuthUser,
    state::AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateChatRequest {
    #[validate(length(min = 1, max = 100))]
    pub member_ids: Vec<String>,
    #[serde(default)]
    pub is_group: bool,
    #[validate(length(max = 120))]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ArchiveRequest {
    pub archived: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub include_archived: bool,
}

#[derive(Debug, Deserialize)]
pub struct TypingRequest {
    pub is_typing: bool,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub id: String,
    pub member_ids: Vec<String>,
    pub is_group: bool,
    pub title: Option<String>,
    pub archived_by: Vec<String>,
    pub hidden_by: Vec<String>,
    pub last_message_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

fn hex_all(ids: &[bson::oid::ObjectId]) -> Vec<String> {
    ids.iter().map(|id| id.to_hex()).collect()
}

pub fn to_chat_response(chat: Chat) -> ChatResponse {
    ChatResponse {
        id: chat.id.to_hex(),
        member_ids: hex_all(&chat.member_ids),
        is_group: chat.is_group,
        title: chat.title,
        archived_by: hex_all(&chat.archived_by),
        hidden_by: hex_all(&chat.hidden_by),
        last_message_at: chat.last_message_at.map(|t| t.timestamp_millis()),
        created_at: chat.created_at.timestamp_millis(),
        updated_at: chat.updated_at.timestamp_millis(),
    }
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ChatResponse>>, ApiError> {
    let chats = state
        .core
        .chats
        .list_chats(auth.user_id, query.include_archived)
        .await?;
    Ok(Json(chats.into_iter().map(to_chat_response).collect()))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateChatRequest>,
) -> Result<(StatusCode, Json<ChatResponse>), ApiError> {
    body.validate()?;
    let member_ids = body
        .member_ids
        .iter()
        .map(|m| parse_id(m, "member_id"))
        .collect::<Result<Vec<_>, _>>()?;

    let chat = state
        .core
        .chats
        .create_chat(auth.user_id, member_ids, body.is_group, body.title)
        .await?;
    Ok((StatusCode::CREATED, Json(to_chat_response(chat))))
}

pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(chat_id): Path<String>,
) -> Result<Json<ChatResponse>, ApiError> {
    let cid = parse_id(&chat_id, "chat_id")?;
    let chat = state.core.chats.get_chat(cid, auth.user_id).await?;
    Ok(Json(to_chat_response(chat)))
}

pub async fn archive(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(chat_id): Path<String>,
    Json(body): Json<ArchiveRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let cid = parse_id(&chat_id, "chat_id")?;
    let chat = state
        .core
        .chats
        .archive_chat(cid, auth.user_id, body.archived)
        .await?;
    Ok(Json(to_chat_response(chat)))
}

/// Hides the chat for the caller; deletes it once every member has.
pub async fn remove(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(chat_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let cid = parse_id(&chat_id, "chat_id")?;
    let result = match state.core.chats.remove_chat(cid, auth.user_id).await? {
        ChatRemoval::Hidden => "hidden",
        ChatRemoval::Deleted => "deleted",
    };
    Ok(Json(serde_json::json!({ "result": result })))
}

pub async fn typing(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(chat_id): Path<String>,
    Json(body): Json<TypingRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let cid = parse_id(&chat_id, "chat_id")?;
    let signal = state
        .core
        .chats
        .typing(cid, auth.user_id, body.is_typing)
        .await?;
    Ok(Json(serde_json::json!({
        "is_typing": signal.is_typing,
        "expires_at": signal.expires_at.timestamp_millis(),
    })))
}
