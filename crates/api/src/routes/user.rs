use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use creatorhub_db::models::{GeoPoint, PublicProfile, User};
use creatorhub_services::dao::NewUser;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    error::{ApiError, parse_id},
    extractors::auth::AuthUser,
    state::AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 80))]
    pub display_name: String,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub skills: Vec<String>,
    pub location: Option<GeoPoint>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 5, max = 32))]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub display_name: String,
    pub skills: Vec<String>,
    pub connections: Vec<String>,
    pub location: Option<GeoPoint>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: String,
    pub display_name: String,
    pub skills: Vec<String>,
}

pub fn to_user_response(user: User) -> UserResponse {
    UserResponse {
        id: user.id.to_hex(),
        display_name: user.display_name,
        skills: user.skills,
        connections: user.connections.iter().map(|c| c.to_hex()).collect(),
        location: user.location,
        email: user.email,
        phone: user.phone,
        created_at: user.created_at.timestamp_millis(),
    }
}

pub fn to_profile_response(profile: PublicProfile) -> ProfileResponse {
    ProfileResponse {
        id: profile.id.to_hex(),
        display_name: profile.display_name,
        skills: profile.skills,
    }
}

/// Seeds a user record. Identity itself is owned upstream.
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    body.validate()?;

    let user = state
        .core
        .users
        .create(NewUser {
            display_name: body.display_name,
            skills: body.skills,
            location: body.location,
            email: body.email,
            phone: body.phone,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(to_user_response(user))))
}

/// Full record for the caller, public profile for anyone else.
pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let uid = parse_id(&user_id, "user_id")?;
    let user = state
        .core
        .users
        .get(uid)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let body = if uid == auth.user_id {
        serde_json::to_value(to_user_response(user))
    } else {
        serde_json::to_value(to_profile_response(user.public_profile()))
    }
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(body))
}
