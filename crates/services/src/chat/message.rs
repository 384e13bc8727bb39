use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use creatorhub_db::models::{ChatMessage, MessageAttachment, MessageReaction};
use tracing::{debug, info};

use super::{ChatEventKind, ChatService};
use crate::clock::{checked_after, saturating_after, secs};
use crate::dao::{DaoError, DaoResult, Filter, PaginatedResult, PaginationParams};

#[derive(Debug, Clone, Default)]
pub struct NewMessage {
    pub content: Option<String>,
    pub attachments: Vec<MessageAttachment>,
    pub metadata: Option<serde_json::Value>,
    /// Ephemeral messages disappear this many seconds after sending.
    pub expires_in_secs: Option<u64>,
}

/// Mutable fields of a sent message; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct MessagePatch {
    pub content: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct ReactionChange {
    pub message: ChatMessage,
    /// False when the call was a no-op.
    pub changed: bool,
}

/// A typing pulse. Never stored.
#[derive(Debug, Clone, Copy)]
pub struct TypingSignal {
    pub chat_id: ObjectId,
    pub user_id: ObjectId,
    pub is_typing: bool,
    pub expires_at: DateTime<Utc>,
}

fn normalize_content(content: Option<String>) -> Option<String> {
    content.filter(|c| !c.trim().is_empty())
}

impl ChatService {
    async fn chat_message(&self, chat_id: ObjectId, message_id: ObjectId) -> DaoResult<ChatMessage> {
        let message = self
            .messages
            .get(message_id)
            .await?
            .ok_or(DaoError::NotFound)?;
        if message.chat_id != chat_id || message.is_expired(self.clock.now()) {
            return Err(DaoError::NotFound);
        }
        Ok(message)
    }

    pub async fn send(
        &self,
        chat_id: ObjectId,
        sender_id: ObjectId,
        new: NewMessage,
    ) -> DaoResult<ChatMessage> {
        let chat = self.member_chat(chat_id, sender_id).await?;

        let content = normalize_content(new.content);
        if content.is_none() && new.attachments.is_empty() {
            return Err(DaoError::Validation(
                "Message content or attachment required".to_string(),
            ));
        }

        let now = self.clock.now();
        let expires_at = match new.expires_in_secs {
            Some(ttl) => Some(
                checked_after(now, ttl)
                    .ok_or_else(|| DaoError::Validation("Invalid expiry".to_string()))?,
            ),
            None => None,
        };
        let message = ChatMessage {
            id: ObjectId::new(),
            chat_id,
            sender_id,
            content,
            attachments: new.attachments,
            metadata: new.metadata,
            created_at: now,
            updated_at: None,
            deleted_at: None,
            delivered_to: chat.member_ids.clone(),
            read_by: vec![sender_id],
            reactions: Vec::new(),
            pinned: false,
            expires_at,
            modified_at: now,
        };

        self.messages.insert(&message).await?;
        self.touch_chat(chat_id).await?;
        debug!(?chat_id, message_id = ?message.id, "Message sent");

        self.emit(
            chat_id,
            chat.member_ids,
            ChatEventKind::MessageCreated(message.clone()),
        );
        Ok(message)
    }

    /// Oldest first; equal timestamps keep id order. Expired ephemeral
    /// messages are removed on the way.
    pub async fn list_messages(
        &self,
        chat_id: ObjectId,
        user_id: ObjectId,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<ChatMessage>> {
        self.member_chat(chat_id, user_id).await?;
        let now = self.clock.now();

        let (expired, mut live): (Vec<ChatMessage>, Vec<ChatMessage>) = self
            .messages
            .find(&Filter::new().eq("chat_id", chat_id))
            .await?
            .into_iter()
            .partition(|m| m.is_expired(now));

        if !expired.is_empty() {
            let ids: Vec<ObjectId> = expired.iter().map(|m| m.id).collect();
            let swept = self.messages.delete(&ids).await?;
            debug!(?chat_id, swept, "Expired messages swept");
        }

        live.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(PaginatedResult::from_sorted(live, params))
    }

    /// Sender-only edit inside the edit window.
    pub async fn update(
        &self,
        chat_id: ObjectId,
        message_id: ObjectId,
        user_id: ObjectId,
        patch: MessagePatch,
    ) -> DaoResult<ChatMessage> {
        let chat = self.member_chat(chat_id, user_id).await?;
        let _guard = self.message_locks.lock(message_id).await;
        let mut message = self.chat_message(chat_id, message_id).await?;

        if message.sender_id != user_id {
            return Err(DaoError::Forbidden(
                "Only the sender can edit this message".to_string(),
            ));
        }
        if message.is_deleted() {
            return Err(DaoError::Validation("Message was deleted".to_string()));
        }
        let now = self.clock.now();
        if now - message.created_at > secs(self.settings.edit_window_secs) {
            return Err(DaoError::Validation("Edit window expired".to_string()));
        }

        if let Some(content) = patch.content {
            let content = normalize_content(Some(content));
            if content.is_none() && message.attachments.is_empty() {
                return Err(DaoError::Validation(
                    "Message content or attachment required".to_string(),
                ));
            }
            message.content = content;
        }
        if let Some(metadata) = patch.metadata {
            message.metadata = Some(metadata);
        }
        message.updated_at = Some(now);
        message.modified_at = now;

        self.messages.upsert(&message).await?;
        self.emit(
            chat_id,
            chat.member_ids,
            ChatEventKind::MessageUpdated(message.clone()),
        );
        Ok(message)
    }

    /// Sender-only delete. The soft path keeps the id and timestamps; the hard
    /// path removes the record. Returns the soft-deleted remains.
    pub async fn remove(
        &self,
        chat_id: ObjectId,
        message_id: ObjectId,
        user_id: ObjectId,
        hard: bool,
    ) -> DaoResult<Option<ChatMessage>> {
        let chat = self.member_chat(chat_id, user_id).await?;
        let _guard = self.message_locks.lock(message_id).await;
        let mut message = self.chat_message(chat_id, message_id).await?;

        if message.sender_id != user_id {
            return Err(DaoError::Forbidden(
                "Only the sender can delete this message".to_string(),
            ));
        }

        if hard {
            self.messages.delete(&[message_id]).await?;
            info!(?chat_id, ?message_id, "Message hard-deleted");
            self.emit(
                chat_id,
                chat.member_ids,
                ChatEventKind::MessageDeleted {
                    message_id,
                    message: None,
                },
            );
            return Ok(None);
        }

        if message.is_deleted() {
            return Ok(Some(message));
        }

        let now = self.clock.now();
        message.content = None;
        message.attachments.clear();
        message.deleted_at = Some(now);
        message.modified_at = now;
        self.messages.upsert(&message).await?;

        self.emit(
            chat_id,
            chat.member_ids,
            ChatEventKind::MessageDeleted {
                message_id,
                message: Some(message.clone()),
            },
        );
        Ok(Some(message))
    }

    pub async fn add_reaction(
        &self,
        chat_id: ObjectId,
        message_id: ObjectId,
        user_id: ObjectId,
        emoji: &str,
    ) -> DaoResult<ReactionChange> {
        let emoji = emoji.trim();
        if emoji.is_empty() {
            return Err(DaoError::Validation("Emoji required".to_string()));
        }
        let chat = self.member_chat(chat_id, user_id).await?;
        let _guard = self.message_locks.lock(message_id).await;
        let mut message = self.chat_message(chat_id, message_id).await?;

        if message.has_reaction(&user_id, emoji) {
            return Ok(ReactionChange {
                message,
                changed: false,
            });
        }

        let now = self.clock.now();
        message.reactions.push(MessageReaction {
            id: ObjectId::new(),
            emoji: emoji.to_string(),
            user_id,
            created_at: now,
        });
        message.modified_at = now;
        self.messages.upsert(&message).await?;

        self.emit(
            chat_id,
            chat.member_ids,
            ChatEventKind::ReactionAdded {
                message_id,
                user_id,
                emoji: emoji.to_string(),
            },
        );
        Ok(ReactionChange {
            message,
            changed: true,
        })
    }

    pub async fn remove_reaction(
        &self,
        chat_id: ObjectId,
        message_id: ObjectId,
        user_id: ObjectId,
        emoji: &str,
    ) -> DaoResult<ReactionChange> {
        let emoji = emoji.trim();
        let chat = self.member_chat(chat_id, user_id).await?;
        let _guard = self.message_locks.lock(message_id).await;
        let mut message = self.chat_message(chat_id, message_id).await?;

        let before = message.reactions.len();
        message
            .reactions
            .retain(|r| !(r.user_id == user_id && r.emoji == emoji));
        if message.reactions.len() == before {
            return Ok(ReactionChange {
                message,
                changed: false,
            });
        }

        message.modified_at = self.clock.now();
        self.messages.upsert(&message).await?;

        self.emit(
            chat_id,
            chat.member_ids,
            ChatEventKind::ReactionRemoved {
                message_id,
                user_id,
                emoji: emoji.to_string(),
            },
        );
        Ok(ReactionChange {
            message,
            changed: true,
        })
    }

    /// Any member may pin or unpin.
    pub async fn pin(
        &self,
        chat_id: ObjectId,
        message_id: ObjectId,
        user_id: ObjectId,
        pinned: bool,
    ) -> DaoResult<ChatMessage> {
        let chat = self.member_chat(chat_id, user_id).await?;
        let _guard = self.message_locks.lock(message_id).await;
        let mut message = self.chat_message(chat_id, message_id).await?;

        if message.pinned != pinned {
            message.pinned = pinned;
            message.modified_at = self.clock.now();
            self.messages.upsert(&message).await?;
            self.emit(
                chat_id,
                chat.member_ids,
                ChatEventKind::MessagePinned { message_id, pinned },
            );
        }
        Ok(message)
    }

    /// Records a read receipt. Returns true only for the first read by
    /// `user_id`; repeats neither write nor emit.
    pub async fn mark_read(
        &self,
        chat_id: ObjectId,
        message_id: ObjectId,
        user_id: ObjectId,
    ) -> DaoResult<bool> {
        let chat = self.member_chat(chat_id, user_id).await?;
        let _guard = self.message_locks.lock(message_id).await;
        let mut message = self.chat_message(chat_id, message_id).await?;

        if message.read_by.contains(&user_id) {
            return Ok(false);
        }
        message.read_by.push(user_id);
        message.modified_at = self.clock.now();
        self.messages.upsert(&message).await?;

        self.emit(
            chat_id,
            chat.member_ids,
            ChatEventKind::Read {
                message_id,
                user_id,
            },
        );
        Ok(true)
    }

    /// Broadcasts a typing pulse to the other members.
    pub async fn typing(
        &self,
        chat_id: ObjectId,
        user_id: ObjectId,
        is_typing: bool,
    ) -> DaoResult<TypingSignal> {
        let chat = self.member_chat(chat_id, user_id).await?;
        let signal = TypingSignal {
            chat_id,
            user_id,
            is_typing,
            expires_at: saturating_after(self.clock.now(), self.settings.typing_expiry_secs),
        };

        let recipients: Vec<ObjectId> = chat
            .member_ids
            .into_iter()
            .filter(|m| *m != user_id)
            .collect();
        self.emit(
            chat_id,
            recipients,
            ChatEventKind::Typing {
                user_id,
                is_typing,
                expires_at: signal.expires_at,
            },
        );
        Ok(signal)
    }
}
