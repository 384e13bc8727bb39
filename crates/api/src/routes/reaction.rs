use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use validator::Validate;

use super::message::{MessageResponse, to_message_response};
use crate::{
    error::{ApiError, parse_id},
    extractors::auth::AuthUser,
    state::AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct AddReactionRequest {
    #[validate(length(min = 1, max = 32))]
    pub emoji: String,
}

#[derive(Debug, serde::Serialize)]
pub struct ReactionResponse {
    pub changed: bool,
    pub message: MessageResponse,
}

pub async fn add(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((chat_id, message_id)): Path<(String, String)>,
    Json(body): Json<AddReactionRequest>,
) -> Result<Json<ReactionResponse>, ApiError> {
    body.validate()?;
    let cid = parse_id(&chat_id, "chat_id")?;
    let mid = parse_id(&message_id, "message_id")?;

    let change = state
        .core
        .chats
        .add_reaction(cid, mid, auth.user_id, &body.emoji)
        .await?;
    Ok(Json(ReactionResponse {
        changed: change.changed,
        message: to_message_response(change.message),
    }))
}

pub async fn remove(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((chat_id, message_id, emoji)): Path<(String, String, String)>,
) -> Result<Json<ReactionResponse>, ApiError> {
    let cid = parse_id(&chat_id, "chat_id")?;
    let mid = parse_id(&message_id, "message_id")?;

    let change = state
        .core
        .chats
        .remove_reaction(cid, mid, auth.user_id, &emoji)
        .await?;
    Ok(Json(ReactionResponse {
        changed: change.changed,
        message: to_message_response(change.message),
    }))
}
