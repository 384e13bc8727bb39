use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::Entity;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub chat_id: ObjectId,
    pub sender_id: ObjectId,
    pub content: Option<String>,
    #[serde(default)]
    pub attachments: Vec<MessageAttachment>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    /// Set by an edit.
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivered_to: Vec<ObjectId>,
    #[serde(default)]
    pub read_by: Vec<ObjectId>,
    #[serde(default)]
    pub reactions: Vec<MessageReaction>,
    #[serde(default)]
    pub pinned: bool,
    pub expires_at: Option<DateTime<Utc>>,
    /// Last write of any kind (edit, reaction, read, pin).
    pub modified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageAttachment {
    pub url: String,
    pub name: String,
    pub content_type: Option<String>,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageReaction {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub emoji: String,
    pub user_id: ObjectId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReactionSummary {
    pub emoji: String,
    pub count: u32,
}

impl ChatMessage {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    pub fn has_reaction(&self, user_id: &ObjectId, emoji: &str) -> bool {
        self.reactions
            .iter()
            .any(|r| r.user_id == *user_id && r.emoji == emoji)
    }

    /// Per-emoji counts in first-seen order.
    pub fn reaction_summary(&self) -> Vec<ReactionSummary> {
        let mut summary: Vec<ReactionSummary> = Vec::new();
        for reaction in &self.reactions {
            match summary.iter_mut().find(|s| s.emoji == reaction.emoji) {
                Some(entry) => entry.count += 1,
                None => summary.push(ReactionSummary {
                    emoji: reaction.emoji.clone(),
                    count: 1,
                }),
            }
        }
        summary
    }
}

impl Entity for ChatMessage {
    const COLLECTION: &'static str = "chat_messages";

    fn id(&self) -> ObjectId {
        self.id
    }

    fn revision(&self) -> DateTime<Utc> {
        self.modified_at
    }
}
