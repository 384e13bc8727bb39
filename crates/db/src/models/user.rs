use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::location::GeoPoint;
use crate::entity::Entity;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub display_name: String,
    #[serde(default)]
    pub skills: Vec<String>,
    /// Grows only through mutual matches.
    #[serde(default)]
    pub connections: Vec<ObjectId>,
    pub location: Option<GeoPoint>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The subset of a user that other users may see.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicProfile {
    pub id: ObjectId,
    pub display_name: String,
    pub skills: Vec<String>,
}

impl User {
    pub fn public_profile(&self) -> PublicProfile {
        PublicProfile {
            id: self.id,
            display_name: self.display_name.clone(),
            skills: self.skills.clone(),
        }
    }

    pub fn is_connected_to(&self, other: &ObjectId) -> bool {
        self.connections.contains(other)
    }
}

impl Entity for User {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> ObjectId {
        self.id
    }

    fn revision(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
