use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::Entity;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    /// Fixed at creation.
    pub member_ids: Vec<ObjectId>,
    #[serde(default)]
    pub is_group: bool,
    pub title: Option<String>,
    /// Unordered pair key for direct chats; unique in the store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct_key: Option<String>,
    #[serde(default)]
    pub archived_by: Vec<ObjectId>,
    #[serde(default)]
    pub hidden_by: Vec<ObjectId>,
    pub created_by: Option<ObjectId>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    pub fn is_member(&self, user_id: &ObjectId) -> bool {
        self.member_ids.contains(user_id)
    }

    pub fn is_archived_by(&self, user_id: &ObjectId) -> bool {
        self.archived_by.contains(user_id)
    }

    pub fn is_hidden_by(&self, user_id: &ObjectId) -> bool {
        self.hidden_by.contains(user_id)
    }

    /// True once every member has hidden the chat.
    pub fn is_hidden_by_all(&self) -> bool {
        self.member_ids.iter().all(|m| self.hidden_by.contains(m))
    }

    /// Order-independent key for the direct chat between two users.
    pub fn direct_key_for(a: &ObjectId, b: &ObjectId) -> String {
        let (lo, hi) = if a.to_hex() <= b.to_hex() { (a, b) } else { (b, a) };
        format!("{}:{}", lo.to_hex(), hi.to_hex())
    }

    /// True for the non-group chat whose members are exactly `{a, b}`.
    pub fn is_direct_between(&self, a: &ObjectId, b: &ObjectId) -> bool {
        !self.is_group
            && self.member_ids.len() == 2
            && self.member_ids.contains(a)
            && self.member_ids.contains(b)
    }
}

impl Entity for Chat {
    const COLLECTION: &'static str = "chats";

    fn id(&self) -> ObjectId {
        self.id
    }

    fn revision(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
