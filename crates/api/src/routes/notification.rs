use axum::{
    Json,
    extract::{Path, Query, State},
};
use creatorhub_db::models::{NotificationEntry, NotificationKind};
use creatorhub_services::dao::PaginationParams;
use serde::Serialize;

use super::Page;
use crate::{
    error::{ApiError, parse_id},
    extractors::auth::AuthUser,
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub body: Option<String>,
    pub link: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: i64,
    pub read_at: Option<i64>,
}

fn to_response(entry: NotificationEntry) -> NotificationResponse {
    NotificationResponse {
        id: entry.id.to_hex(),
        kind: entry.kind,
        title: entry.title,
        body: entry.body,
        link: entry.link,
        metadata: entry.metadata,
        created_at: entry.created_at.timestamp_millis(),
        read_at: entry.read_at.map(|t| t.timestamp_millis()),
    }
}

#[derive(Debug, Serialize)]
pub struct NotificationList {
    #[serde(flatten)]
    pub page: Page<NotificationResponse>,
    pub unread: usize,
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<NotificationList>, ApiError> {
    let result = state
        .core
        .notifications
        .list_for_user(auth.user_id, &params)
        .await?;
    let unread = state.core.notifications.unread_count(auth.user_id).await?;
    Ok(Json(NotificationList {
        page: Page::map(result, to_response),
        unread,
    }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(notification_id): Path<String>,
) -> Result<Json<NotificationResponse>, ApiError> {
    let nid = parse_id(&notification_id, "notification_id")?;
    let entry = state
        .core
        .notifications
        .mark_read(nid, auth.user_id)
        .await?;
    Ok(Json(to_response(entry)))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let marked = state.core.notifications.mark_all_read(auth.user_id).await?;
    Ok(Json(serde_json::json!({ "marked": marked })))
}
