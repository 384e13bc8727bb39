use axum::{Json, extract::State, http::StatusCode};
use creatorhub_db::models::{GeoPoint, Hub};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateHubRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub location: GeoPoint,
}

#[derive(Debug, Serialize)]
pub struct HubResponse {
    pub id: String,
    pub name: String,
    pub location: GeoPoint,
    pub active_users: Vec<String>,
    pub active_count: usize,
    pub created_at: i64,
}

fn to_response(hub: Hub, active_users: Vec<String>) -> HubResponse {
    HubResponse {
        id: hub.id.to_hex(),
        name: hub.name,
        location: hub.location,
        active_count: active_users.len(),
        active_users,
        created_at: hub.created_at.timestamp_millis(),
    }
}

/// Hubs with their current occupancy.
pub async fn list(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<Vec<HubResponse>>, ApiError> {
    let hubs = state.core.presence.hub_occupancy().await?;
    Ok(Json(
        hubs.into_iter()
            .map(|p| {
                let users = p.active_users.iter().map(|u| u.to_hex()).collect();
                to_response(p.hub, users)
            })
            .collect(),
    ))
}

pub async fn create(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(body): Json<CreateHubRequest>,
) -> Result<(StatusCode, Json<HubResponse>), ApiError> {
    body.validate()?;
    let hub = state.core.hubs.create(body.name, body.location).await?;
    Ok((StatusCode::CREATED, Json(to_response(hub, Vec::new()))))
}
