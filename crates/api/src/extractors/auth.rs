use axum::{extract::FromRequestParts, http::request::Parts};
use bson::oid::ObjectId;

use crate::error::ApiError;

pub const USER_HEADER: &str = "x-user-id";

/// Caller identity supplied by the upstream auth layer in `X-User-Id`.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: ObjectId,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("No user identity provided".to_string()))?;

        let user_id = ObjectId::parse_str(raw.trim())
            .map_err(|_| ApiError::Unauthorized("Invalid user identity".to_string()))?;

        Ok(AuthUser { user_id })
    }
}
