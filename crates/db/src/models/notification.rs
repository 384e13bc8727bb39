use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::Entity;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEntry {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: ObjectId,
    pub kind: NotificationKind,
    pub title: String,
    pub body: Option<String>,
    pub link: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// Identifies the source event; one entry per (user_id, dedupe_key).
    pub dedupe_key: String,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Like,
    Match,
    HubAlert,
}

impl NotificationEntry {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

impl Entity for NotificationEntry {
    const COLLECTION: &'static str = "notifications";

    fn id(&self) -> ObjectId {
        self.id
    }

    fn revision(&self) -> DateTime<Utc> {
        self.read_at.unwrap_or(self.created_at)
    }
}
