use creatorhub_db::Entity;
use creatorhub_db::models::{
    Chat, ChatMessage, Checkin, Hub, MatchAction, NotificationEntry, User,
};
use mongodb::Database;
use std::sync::Arc;

use crate::dao::{FallbackStore, MemoryStore, MongoStore, Store};

const CHAT_UNIQUE: &[&str] = &["direct_key"];
const ACTION_UNIQUE: &[&str] = &["user_id", "target_id"];
const NOTIFICATION_UNIQUE: &[&str] = &["user_id", "dedupe_key"];

/// One store per collection.
#[derive(Clone)]
pub struct Backends {
    pub users: Arc<dyn Store<User>>,
    pub hubs: Arc<dyn Store<Hub>>,
    pub checkins: Arc<dyn Store<Checkin>>,
    pub actions: Arc<dyn Store<MatchAction>>,
    pub chats: Arc<dyn Store<Chat>>,
    pub messages: Arc<dyn Store<ChatMessage>>,
    pub notifications: Arc<dyn Store<NotificationEntry>>,
}

fn fallback<T: Entity>(db: &Database, unique: &'static [&'static str]) -> Arc<dyn Store<T>> {
    Arc::new(FallbackStore::with_mirror(
        Arc::new(MongoStore::<T>::new(db)),
        MemoryStore::with_unique(unique),
    ))
}

impl Backends {
    /// MongoDB collections, each behind an in-memory fallback mirror.
    pub fn mongo(db: &Database) -> Self {
        Self {
            users: fallback(db, &[]),
            hubs: fallback(db, &[]),
            checkins: fallback(db, &[]),
            actions: fallback(db, ACTION_UNIQUE),
            chats: fallback(db, CHAT_UNIQUE),
            messages: fallback(db, &[]),
            notifications: fallback(db, NOTIFICATION_UNIQUE),
        }
    }

    /// Process-local stores with the same unique keys as the indexes.
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(MemoryStore::<User>::new()),
            hubs: Arc::new(MemoryStore::<Hub>::new()),
            checkins: Arc::new(MemoryStore::<Checkin>::new()),
            actions: Arc::new(MemoryStore::<MatchAction>::with_unique(ACTION_UNIQUE)),
            chats: Arc::new(MemoryStore::<Chat>::with_unique(CHAT_UNIQUE)),
            messages: Arc::new(MemoryStore::<ChatMessage>::new()),
            notifications: Arc::new(MemoryStore::<NotificationEntry>::with_unique(
                NOTIFICATION_UNIQUE,
            )),
        }
    }

    /// Writes held only in memory, across all collections.
    pub fn pending_writes(&self) -> usize {
        self.users.pending_writes()
            + self.hubs.pending_writes()
            + self.checkins.pending_writes()
            + self.actions.pending_writes()
            + self.chats.pending_writes()
            + self.messages.pending_writes()
            + self.notifications.pending_writes()
    }
}
