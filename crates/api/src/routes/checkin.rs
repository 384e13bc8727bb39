use axum::{
    Json,
    extract::{Query, State},
};
use creatorhub_db::models::{Checkin, CheckinStatus, GeoPoint};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, parse_id},
    extractors::auth::AuthUser,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CheckinRequest {
    pub hub_id: Option<String>,
    pub location: GeoPoint,
    #[serde(default)]
    pub status: CheckinStatus,
}

#[derive(Debug, Deserialize)]
pub struct NearQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct CheckinResponse {
    pub id: String,
    pub user_id: String,
    pub hub_id: Option<String>,
    pub location: GeoPoint,
    pub status: CheckinStatus,
    pub created_at: i64,
    pub expires_at: i64,
}

fn to_response(checkin: Checkin) -> CheckinResponse {
    CheckinResponse {
        id: checkin.id.to_hex(),
        user_id: checkin.user_id.to_hex(),
        hub_id: checkin.hub_id.map(|h| h.to_hex()),
        location: checkin.location,
        status: checkin.status,
        created_at: checkin.created_at.timestamp_millis(),
        expires_at: checkin.expires_at.timestamp_millis(),
    }
}

pub async fn checkin(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CheckinRequest>,
) -> Result<Json<CheckinResponse>, ApiError> {
    state.core.users.require(auth.user_id).await?;
    let hub_id = body
        .hub_id
        .as_deref()
        .map(|h| parse_id(h, "hub_id"))
        .transpose()?;

    let checkin = state
        .core
        .presence
        .checkin(auth.user_id, hub_id, body.location, body.status)
        .await?;
    Ok(Json(to_response(checkin)))
}

pub async fn checkout(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let removed = state.core.presence.checkout(auth.user_id).await?;
    Ok(Json(serde_json::json!({ "checked_out": removed })))
}

/// Active check-ins, closest first when `lat`/`lng` are given.
pub async fn list(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<NearQuery>,
) -> Result<Json<Vec<CheckinResponse>>, ApiError> {
    let near = match (query.lat, query.lng) {
        (Some(lat), Some(lng)) => {
            let point = GeoPoint::new(lat, lng);
            if !point.is_valid() {
                return Err(ApiError::BadRequest("Invalid coordinates".to_string()));
            }
            Some(point)
        }
        (None, None) => None,
        _ => return Err(ApiError::BadRequest("lat and lng go together".to_string())),
    };

    let active = state.core.presence.list_active(near).await?;
    Ok(Json(active.into_iter().map(to_response).collect()))
}
