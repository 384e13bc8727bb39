use bson::oid::ObjectId;
use creatorhub_db::models::{GeoPoint, PublicProfile, User};
use std::sync::Arc;
use tracing::info;

use super::base::{DaoError, DaoResult, Filter, Store};
use crate::clock::Clock;
use crate::locks::KeyedLocks;

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub display_name: String,
    pub skills: Vec<String>,
    pub location: Option<GeoPoint>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Read side of user identity used by every engine, plus the few writes the
/// core owns (signup seed, connections from mutual matches).
pub struct UserDirectory {
    store: Arc<dyn Store<User>>,
    clock: Arc<dyn Clock>,
    locks: KeyedLocks<ObjectId>,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn Store<User>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            locks: KeyedLocks::new(),
        }
    }

    pub async fn create(&self, new_user: NewUser) -> DaoResult<User> {
        let display_name = new_user.display_name.trim().to_string();
        if display_name.is_empty() {
            return Err(DaoError::Validation("Display name is required".to_string()));
        }
        if new_user.location.is_some_and(|l| !l.is_valid()) {
            return Err(DaoError::Validation("Invalid location".to_string()));
        }

        let now = self.clock.now();
        let user = User {
            id: ObjectId::new(),
            display_name,
            skills: normalize_skills(new_user.skills),
            connections: Vec::new(),
            location: new_user.location,
            email: new_user.email,
            phone: new_user.phone,
            created_at: now,
            updated_at: now,
        };

        self.store.insert(&user).await?;
        info!(user_id = ?user.id, "User created");
        Ok(user)
    }

    pub async fn get(&self, id: ObjectId) -> DaoResult<Option<User>> {
        self.store.get(id).await
    }

    /// Resolves a user or fails validation.
    pub async fn require(&self, id: ObjectId) -> DaoResult<User> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| DaoError::Validation(format!("User not found: {}", id.to_hex())))
    }

    pub async fn profile(&self, id: ObjectId) -> DaoResult<PublicProfile> {
        Ok(self.require(id).await?.public_profile())
    }

    pub async fn list(&self) -> DaoResult<Vec<User>> {
        self.store.find(&Filter::new()).await
    }

    /// Records `other` in `user_id`'s connections. Idempotent.
    pub async fn add_connection(&self, user_id: ObjectId, other: ObjectId) -> DaoResult<()> {
        let _guard = self.locks.lock(user_id).await;
        let mut user = self.require(user_id).await?;
        if user.is_connected_to(&other) {
            return Ok(());
        }
        user.connections.push(other);
        user.updated_at = self.clock.now();
        self.store.upsert(&user).await
    }
}

fn normalize_skills(skills: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(skills.len());
    for skill in skills {
        let skill = skill.trim().to_lowercase();
        if !skill.is_empty() && !normalized.contains(&skill) {
            normalized.push(skill);
        }
    }
    normalized
}
