pub mod events;
pub mod message;

use bson::oid::ObjectId;
use creatorhub_config::MessagingSettings;
use creatorhub_db::models::{Chat, ChatMessage};
use std::sync::Arc;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::dao::{DaoError, DaoResult, Filter, Store, UserDirectory};
use crate::locks::KeyedLocks;

pub use events::{ChatEvent, ChatEventBus, ChatEventKind, Subscription};
pub use message::{MessagePatch, NewMessage, ReactionChange, TypingSignal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRemoval {
    /// Hidden for the caller; other members still see it.
    Hidden,
    /// Every member had hidden it, so it is gone with its messages.
    Deleted,
}

/// Chat and message lifecycle.
pub struct ChatService {
    chats: Arc<dyn Store<Chat>>,
    messages: Arc<dyn Store<ChatMessage>>,
    users: Arc<UserDirectory>,
    events: Arc<ChatEventBus>,
    clock: Arc<dyn Clock>,
    settings: MessagingSettings,
    chat_locks: KeyedLocks<ObjectId>,
    message_locks: KeyedLocks<ObjectId>,
    pair_locks: KeyedLocks<String>,
}

impl ChatService {
    pub fn new(
        chats: Arc<dyn Store<Chat>>,
        messages: Arc<dyn Store<ChatMessage>>,
        users: Arc<UserDirectory>,
        clock: Arc<dyn Clock>,
        settings: MessagingSettings,
    ) -> Self {
        Self {
            chats,
            messages,
            users,
            events: Arc::new(ChatEventBus::new()),
            clock,
            settings,
            chat_locks: KeyedLocks::new(),
            message_locks: KeyedLocks::new(),
            pair_locks: KeyedLocks::new(),
        }
    }

    pub fn events(&self) -> &Arc<ChatEventBus> {
        &self.events
    }

    /// Registers a listener for every lifecycle event of this engine.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ChatEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(handler)
    }

    fn emit(&self, chat_id: ObjectId, recipients: Vec<ObjectId>, kind: ChatEventKind) {
        self.events.publish(ChatEvent {
            chat_id,
            recipients,
            kind,
        });
    }

    pub(crate) async fn member_chat(&self, chat_id: ObjectId, user_id: ObjectId) -> DaoResult<Chat> {
        let chat = self.chats.get(chat_id).await?.ok_or(DaoError::NotFound)?;
        if !chat.is_member(&user_id) {
            return Err(DaoError::Validation("Not a chat member".to_string()));
        }
        Ok(chat)
    }

    pub async fn get_chat(&self, chat_id: ObjectId, user_id: ObjectId) -> DaoResult<Chat> {
        self.member_chat(chat_id, user_id).await
    }

    /// Creates a group chat, or returns the direct chat for a two-member
    /// non-group request. The creator is always a member.
    pub async fn create_chat(
        &self,
        creator_id: ObjectId,
        member_ids: Vec<ObjectId>,
        is_group: bool,
        title: Option<String>,
    ) -> DaoResult<Chat> {
        let mut members = vec![creator_id];
        for id in member_ids {
            if !members.contains(&id) {
                members.push(id);
            }
        }
        for id in &members {
            self.users.require(*id).await?;
        }

        if !is_group {
            if members.len() != 2 {
                return Err(DaoError::Validation(
                    "A direct chat needs exactly two members".to_string(),
                ));
            }
            let (chat, _) = self.ensure_direct_chat(members[0], members[1]).await?;
            return Ok(chat);
        }

        if members.len() < 2 {
            return Err(DaoError::Validation(
                "A group chat needs at least two members".to_string(),
            ));
        }

        let now = self.clock.now();
        let chat = Chat {
            id: ObjectId::new(),
            member_ids: members,
            is_group: true,
            title: title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
            direct_key: None,
            archived_by: Vec::new(),
            hidden_by: Vec::new(),
            created_by: Some(creator_id),
            last_message_at: None,
            created_at: now,
            updated_at: now,
        };
        self.chats.insert(&chat).await?;
        info!(chat_id = ?chat.id, members = chat.member_ids.len(), "Group chat created");
        self.emit(chat.id, chat.member_ids.clone(), ChatEventKind::ChatUpdated(chat.clone()));
        Ok(chat)
    }

    async fn find_direct_chat(&self, a: ObjectId, b: ObjectId) -> DaoResult<Option<Chat>> {
        Ok(self
            .chats
            .find(
                &Filter::new()
                    .eq("is_group", false)
                    .contains("member_ids", a)
                    .contains("member_ids", b),
            )
            .await?
            .into_iter()
            .find(|c| c.is_direct_between(&a, &b)))
    }

    /// The unique direct chat between `a` and `b`, created if absent.
    /// Returns whether this call created it.
    pub async fn ensure_direct_chat(&self, a: ObjectId, b: ObjectId) -> DaoResult<(Chat, bool)> {
        let key = Chat::direct_key_for(&a, &b);
        let _guard = self.pair_locks.lock(key.clone()).await;

        if let Some(existing) = self.find_direct_chat(a, b).await? {
            return Ok((existing, false));
        }

        let now = self.clock.now();
        let chat = Chat {
            id: ObjectId::new(),
            member_ids: vec![a, b],
            is_group: false,
            title: None,
            direct_key: Some(key),
            archived_by: Vec::new(),
            hidden_by: Vec::new(),
            created_by: None,
            last_message_at: None,
            created_at: now,
            updated_at: now,
        };

        match self.chats.insert(&chat).await {
            Ok(()) => {}
            Err(DaoError::DuplicateKey(_)) => {
                // Another process won the race.
                return match self.find_direct_chat(a, b).await? {
                    Some(winner) => Ok((winner, false)),
                    None => Err(DaoError::DuplicateKey(
                        "Direct chat exists but is not readable".to_string(),
                    )),
                };
            }
            Err(e) => return Err(e),
        }

        info!(chat_id = ?chat.id, "Direct chat created");
        self.emit(chat.id, chat.member_ids.clone(), ChatEventKind::ChatUpdated(chat.clone()));
        Ok((chat, true))
    }

    /// Chats of `user_id` it has not hidden, most recently active first.
    pub async fn list_chats(&self, user_id: ObjectId, include_archived: bool) -> DaoResult<Vec<Chat>> {
        let mut chats: Vec<Chat> = self
            .chats
            .find(&Filter::new().contains("member_ids", user_id))
            .await?
            .into_iter()
            .filter(|c| !c.is_hidden_by(&user_id))
            .filter(|c| include_archived || !c.is_archived_by(&user_id))
            .collect();

        chats.sort_by(|a, b| {
            let la = a.last_message_at.unwrap_or(a.created_at);
            let lb = b.last_message_at.unwrap_or(b.created_at);
            lb.cmp(&la).then(b.id.cmp(&a.id))
        });
        Ok(chats)
    }

    /// Per-member archive flag.
    pub async fn archive_chat(
        &self,
        chat_id: ObjectId,
        user_id: ObjectId,
        archived: bool,
    ) -> DaoResult<Chat> {
        let _guard = self.chat_locks.lock(chat_id).await;
        let mut chat = self.member_chat(chat_id, user_id).await?;

        let changed = if archived {
            if chat.is_archived_by(&user_id) {
                false
            } else {
                chat.archived_by.push(user_id);
                true
            }
        } else {
            let before = chat.archived_by.len();
            chat.archived_by.retain(|id| *id != user_id);
            before != chat.archived_by.len()
        };

        if changed {
            chat.updated_at = self.clock.now();
            self.chats.upsert(&chat).await?;
            self.emit(chat.id, vec![user_id], ChatEventKind::ChatUpdated(chat.clone()));
        }
        Ok(chat)
    }

    /// Hides the chat for `user_id`; the last member to hide it deletes the
    /// chat and all its messages.
    pub async fn remove_chat(&self, chat_id: ObjectId, user_id: ObjectId) -> DaoResult<ChatRemoval> {
        let _guard = self.chat_locks.lock(chat_id).await;
        let mut chat = self.member_chat(chat_id, user_id).await?;

        if !chat.is_hidden_by(&user_id) {
            chat.hidden_by.push(user_id);
        }

        if chat.is_hidden_by_all() {
            self.purge_chat(&chat).await?;
            self.emit(chat.id, chat.member_ids.clone(), ChatEventKind::ChatRemoved);
            return Ok(ChatRemoval::Deleted);
        }

        chat.updated_at = self.clock.now();
        self.chats.upsert(&chat).await?;
        self.emit(chat.id, vec![user_id], ChatEventKind::ChatUpdated(chat.clone()));
        Ok(ChatRemoval::Hidden)
    }

    async fn purge_chat(&self, chat: &Chat) -> DaoResult<()> {
        let message_ids: Vec<ObjectId> = self
            .messages
            .find(&Filter::new().eq("chat_id", chat.id))
            .await?
            .iter()
            .map(|m| m.id)
            .collect();
        let removed = self.messages.delete(&message_ids).await?;
        if removed < message_ids.len() as u64 {
            warn!(chat_id = ?chat.id, removed, expected = message_ids.len(), "Partial message purge");
        }
        self.chats.delete(&[chat.id]).await?;
        info!(chat_id = ?chat.id, messages = message_ids.len(), "Chat deleted");
        Ok(())
    }

    /// Bumps the chat's activity timestamp after a send.
    async fn touch_chat(&self, chat_id: ObjectId) -> DaoResult<()> {
        let _guard = self.chat_locks.lock(chat_id).await;
        if let Some(mut chat) = self.chats.get(chat_id).await? {
            let now = self.clock.now();
            chat.last_message_at = Some(now);
            chat.updated_at = now;
            self.chats.upsert(&chat).await?;
        }
        Ok(())
    }
}
