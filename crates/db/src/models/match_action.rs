use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::Entity;

/// Directional swipe from `user_id` toward `target_id`. One per ordered pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchAction {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: ObjectId,
    pub target_id: ObjectId,
    pub action: MatchActionKind,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchActionKind {
    Connected,
    Skipped,
}

impl MatchActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchActionKind::Connected => "connected",
            MatchActionKind::Skipped => "skipped",
        }
    }
}

impl Entity for MatchAction {
    const COLLECTION: &'static str = "match_actions";

    fn id(&self) -> ObjectId {
        self.id
    }

    fn revision(&self) -> DateTime<Utc> {
        self.created_at
    }
}
