use axum::{Json, extract::State};
use creatorhub_db::models::MatchActionKind;
use creatorhub_services::matching::MatchSuggestion;
use serde::{Deserialize, Serialize};

use super::user::{ProfileResponse, to_profile_response};
use crate::{
    error::{ApiError, parse_id},
    extractors::auth::AuthUser,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub target_id: String,
    pub action: MatchActionKind,
    /// Client-side timestamp in epoch millis.
    pub created_at: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SuggestionResponse {
    pub profile: ProfileResponse,
    pub shared_hub: bool,
    pub hub_id: Option<String>,
    pub distance_km: Option<f64>,
    pub shared_skills: Vec<String>,
    pub score: f64,
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub chat_id: String,
    pub profile: ProfileResponse,
    pub chat_created: bool,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub target_id: String,
    pub action: MatchActionKind,
    pub created_at: i64,
    pub matched: Option<MatchResponse>,
}

fn to_suggestion(s: MatchSuggestion) -> SuggestionResponse {
    SuggestionResponse {
        profile: to_profile_response(s.profile),
        shared_hub: s.shared_hub,
        hub_id: s.hub_id.map(|h| h.to_hex()),
        distance_km: s.distance_km,
        shared_skills: s.shared_skills,
        score: s.score,
    }
}

pub async fn suggestions(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<SuggestionResponse>>, ApiError> {
    let suggestions = state.core.matches.suggest(auth.user_id).await?;
    Ok(Json(suggestions.into_iter().map(to_suggestion).collect()))
}

pub async fn action(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<ActionRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    let target_id = parse_id(&body.target_id, "target_id")?;
    let created_at = body
        .created_at
        .map(|ms| {
            chrono::DateTime::from_timestamp_millis(ms)
                .ok_or_else(|| ApiError::BadRequest("Invalid created_at".to_string()))
        })
        .transpose()?;

    let outcome = state
        .core
        .matches
        .record_action(auth.user_id, target_id, body.action, created_at)
        .await?;

    Ok(Json(ActionResponse {
        target_id: outcome.action.target_id.to_hex(),
        action: outcome.action.action,
        created_at: outcome.action.created_at.timestamp_millis(),
        matched: outcome.matched.map(|m| MatchResponse {
            chat_id: m.chat_id.to_hex(),
            profile: to_profile_response(m.profile),
            chat_created: m.chat_created,
        }),
    }))
}
