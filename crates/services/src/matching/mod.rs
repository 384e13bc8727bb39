pub mod ranking;

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use creatorhub_config::MatchingSettings;
use creatorhub_db::models::{MatchAction, MatchActionKind, NotificationKind, PublicProfile, User};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

use crate::chat::ChatService;
use crate::clock::Clock;
use crate::dao::{DaoError, DaoResult, Filter, HubDirectory, Store, UserDirectory};
use crate::locks::KeyedLocks;
use crate::notification::{NotificationOutbox, NotificationTask};
use crate::presence::PresenceService;

pub use ranking::{MatchSuggestion, RankingInput, rank};

/// Mutual match resolved by an action.
#[derive(Debug, Clone)]
pub struct MatchInfo {
    pub chat_id: ObjectId,
    pub profile: PublicProfile,
    /// False when the chat already existed.
    pub chat_created: bool,
}

#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub action: MatchAction,
    pub matched: Option<MatchInfo>,
}

/// Suggestions plus the directional like/skip ledger.
pub struct MatchService {
    users: Arc<UserDirectory>,
    hubs: Arc<HubDirectory>,
    presence: Arc<PresenceService>,
    chats: Arc<ChatService>,
    actions: Arc<dyn Store<MatchAction>>,
    outbox: NotificationOutbox,
    clock: Arc<dyn Clock>,
    settings: MatchingSettings,
    pair_locks: KeyedLocks<(ObjectId, ObjectId)>,
}

impl MatchService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<UserDirectory>,
        hubs: Arc<HubDirectory>,
        presence: Arc<PresenceService>,
        chats: Arc<ChatService>,
        actions: Arc<dyn Store<MatchAction>>,
        outbox: NotificationOutbox,
        clock: Arc<dyn Clock>,
        settings: MatchingSettings,
    ) -> Self {
        Self {
            users,
            hubs,
            presence,
            chats,
            actions,
            outbox,
            clock,
            settings,
            pair_locks: KeyedLocks::new(),
        }
    }

    pub async fn suggest(&self, user_id: ObjectId) -> DaoResult<Vec<MatchSuggestion>> {
        let requester = self.users.require(user_id).await?;
        let candidates = self.users.list().await?;
        let hubs = self.hubs.list().await?;
        let user_hubs = self.presence.user_hubs().await?;
        let acted_on: HashSet<ObjectId> = self
            .actions_by(user_id)
            .await?
            .into_iter()
            .map(|a| a.target_id)
            .collect();

        Ok(rank(
            &RankingInput {
                requester: &requester,
                candidates: &candidates,
                hubs: &hubs,
                user_hubs: &user_hubs,
                acted_on: &acted_on,
            },
            &self.settings,
        ))
    }

    pub async fn actions_by(&self, user_id: ObjectId) -> DaoResult<Vec<MatchAction>> {
        self.actions
            .find(&Filter::new().eq("user_id", user_id))
            .await
    }

    async fn find_action(
        &self,
        user_id: ObjectId,
        target_id: ObjectId,
    ) -> DaoResult<Option<MatchAction>> {
        Ok(self
            .actions
            .find(
                &Filter::new()
                    .eq("user_id", user_id)
                    .eq("target_id", target_id),
            )
            .await?
            .into_iter()
            .max_by_key(|a| a.created_at))
    }

    /// Records the newest action for `(user_id, target_id)` and provisions
    /// the direct chat once both sides have connected.
    pub async fn record_action(
        &self,
        user_id: ObjectId,
        target_id: ObjectId,
        kind: MatchActionKind,
        created_at: Option<DateTime<Utc>>,
    ) -> DaoResult<ActionOutcome> {
        if user_id == target_id {
            return Err(DaoError::Validation("Cannot act on yourself".to_string()));
        }
        let actor = self.users.require(user_id).await?;
        let target = self.users.require(target_id).await?;

        let (action, previous) = {
            let _guard = self.pair_locks.lock((user_id, target_id)).await;
            let existing = self.find_action(user_id, target_id).await?;
            let action = MatchAction {
                id: existing.as_ref().map_or_else(ObjectId::new, |a| a.id),
                user_id,
                target_id,
                action: kind,
                created_at: created_at.unwrap_or_else(|| self.clock.now()),
            };
            self.actions.upsert(&action).await?;
            (action, existing.map(|a| a.action))
        };
        info!(?user_id, ?target_id, action = kind.as_str(), "Match action recorded");

        if kind != MatchActionKind::Connected {
            return Ok(ActionOutcome {
                action,
                matched: None,
            });
        }

        // Repeating a standing like changes nothing the target hasn't seen.
        if previous != Some(MatchActionKind::Connected) {
            self.notify_like(&actor, &action);
        }

        let reciprocal = self
            .find_action(target_id, user_id)
            .await?
            .is_some_and(|a| a.action == MatchActionKind::Connected);
        if !reciprocal {
            return Ok(ActionOutcome {
                action,
                matched: None,
            });
        }

        let (chat, chat_created) = self.chats.ensure_direct_chat(user_id, target_id).await?;
        self.users.add_connection(user_id, target_id).await?;
        self.users.add_connection(target_id, user_id).await?;

        if chat_created {
            info!(?user_id, ?target_id, chat_id = ?chat.id, "Mutual match");
            self.notify_match(&actor, &target, chat.id);
        }

        Ok(ActionOutcome {
            action,
            matched: Some(MatchInfo {
                chat_id: chat.id,
                profile: target.public_profile(),
                chat_created,
            }),
        })
    }

    fn notify_like(&self, actor: &User, like: &MatchAction) {
        self.outbox.enqueue(NotificationTask {
            user_id: like.target_id,
            kind: NotificationKind::Like,
            title: format!("{} liked your profile", actor.display_name),
            body: None,
            link: Some(format!("/profiles/{}", actor.id.to_hex())),
            metadata: serde_json::json!({ "profile_id": actor.id.to_hex() }),
            dedupe_key: format!(
                "like:{}:{}",
                actor.id.to_hex(),
                like.created_at.timestamp_millis()
            ),
        });
    }

    fn notify_match(&self, a: &User, b: &User, chat_id: ObjectId) {
        for (recipient, counterpart) in [(a, b), (b, a)] {
            self.outbox.enqueue(NotificationTask {
                user_id: recipient.id,
                kind: NotificationKind::Match,
                title: format!("You matched with {}", counterpart.display_name),
                body: Some("Say hello!".to_string()),
                link: Some(format!("/chats/{}", chat_id.to_hex())),
                metadata: serde_json::json!({
                    "chat_id": chat_id.to_hex(),
                    "profile_id": counterpart.id.to_hex(),
                }),
                dedupe_key: format!("match:{}", chat_id.to_hex()),
            });
        }
    }
}
