use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::location::GeoPoint;
use crate::entity::Entity;

/// A gathering point. Who is there is derived from check-ins, never stored here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hub {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub location: GeoPoint,
    pub created_at: DateTime<Utc>,
}

impl Entity for Hub {
    const COLLECTION: &'static str = "hubs";

    fn id(&self) -> ObjectId {
        self.id
    }

    fn revision(&self) -> DateTime<Utc> {
        self.created_at
    }
}
