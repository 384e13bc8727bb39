use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::location::GeoPoint;
use crate::entity::Entity;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkin {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: ObjectId,
    pub hub_id: Option<ObjectId>,
    pub location: GeoPoint,
    #[serde(default)]
    pub status: CheckinStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckinStatus {
    #[default]
    Online,
    Offline,
}

impl Checkin {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

impl Entity for Checkin {
    const COLLECTION: &'static str = "checkins";

    fn id(&self) -> ObjectId {
        self.id
    }

    fn revision(&self) -> DateTime<Utc> {
        self.created_at
    }
}
