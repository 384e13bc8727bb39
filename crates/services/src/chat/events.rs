use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use creatorhub_db::models::{Chat, ChatMessage};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

#[derive(Debug, Clone)]
pub enum ChatEventKind {
    MessageCreated(ChatMessage),
    MessageUpdated(ChatMessage),
    MessageDeleted {
        message_id: ObjectId,
        /// Soft-deleted remains, absent after a hard delete.
        message: Option<ChatMessage>,
    },
    MessagePinned {
        message_id: ObjectId,
        pinned: bool,
    },
    ReactionAdded {
        message_id: ObjectId,
        user_id: ObjectId,
        emoji: String,
    },
    ReactionRemoved {
        message_id: ObjectId,
        user_id: ObjectId,
        emoji: String,
    },
    Typing {
        user_id: ObjectId,
        is_typing: bool,
        expires_at: DateTime<Utc>,
    },
    Read {
        message_id: ObjectId,
        user_id: ObjectId,
    },
    ChatUpdated(Chat),
    ChatRemoved,
}

impl ChatEventKind {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            ChatEventKind::MessageCreated(_) => "message:created",
            ChatEventKind::MessageUpdated(_) => "message:updated",
            ChatEventKind::MessageDeleted { .. } => "message:deleted",
            ChatEventKind::MessagePinned { .. } => "message:pinned",
            ChatEventKind::ReactionAdded { .. } => "reaction:added",
            ChatEventKind::ReactionRemoved { .. } => "reaction:removed",
            ChatEventKind::Typing { .. } => "typing",
            ChatEventKind::Read { .. } => "read",
            ChatEventKind::ChatUpdated(_) => "chat:updated",
            ChatEventKind::ChatRemoved => "chat:removed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatEvent {
    pub chat_id: ObjectId,
    /// Users the transport should deliver to.
    pub recipients: Vec<ObjectId>,
    pub kind: ChatEventKind,
}

type Handler = Arc<dyn Fn(&ChatEvent) + Send + Sync>;

/// Lifecycle event fan-out owned by one chat engine instance. Handlers run
/// synchronously in publish order.
#[derive(Default)]
pub struct ChatEventBus {
    next_id: AtomicU64,
    handlers: RwLock<Vec<(u64, Handler)>>,
}

impl ChatEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(self: &Arc<Self>, handler: F) -> Subscription
    where
        F: Fn(&ChatEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers.write().push((id, Arc::new(handler)));
        Subscription {
            id,
            bus: Arc::downgrade(self),
        }
    }

    pub fn publish(&self, event: ChatEvent) {
        let handlers: Vec<Handler> = self
            .handlers
            .read()
            .iter()
            .map(|(_, h)| Arc::clone(h))
            .collect();
        for handler in handlers {
            handler(&event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().len()
    }

    fn remove(&self, id: u64) {
        self.handlers.write().retain(|(hid, _)| *hid != id);
    }
}

/// Keeps a handler registered until dropped or unsubscribed.
#[must_use = "dropping a Subscription unsubscribes its handler"]
pub struct Subscription {
    id: u64,
    bus: Weak<ChatEventBus>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(self.id);
        }
    }
}
