use creatorhub_config::Settings;
use std::sync::Arc;

use crate::backends::Backends;
use crate::chat::ChatService;
use crate::clock::Clock;
use crate::dao::{HubDirectory, UserDirectory};
use crate::matching::MatchService;
use crate::notification::{self, NotificationOutbox, NotificationService, NotificationWorker, Notifier};
use crate::presence::PresenceService;

/// Every engine wired over one set of stores.
#[derive(Clone)]
pub struct Core {
    pub users: Arc<UserDirectory>,
    pub hubs: Arc<HubDirectory>,
    pub presence: Arc<PresenceService>,
    pub matches: Arc<MatchService>,
    pub chats: Arc<ChatService>,
    pub notifications: Arc<NotificationService>,
    pub outbox: NotificationOutbox,
    pub backends: Backends,
}

impl Core {
    /// The worker must be spawned for notifications to be persisted.
    pub fn build(
        backends: &Backends,
        settings: &Settings,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> (Self, NotificationWorker) {
        let users = Arc::new(UserDirectory::new(backends.users.clone(), clock.clone()));
        let hubs = Arc::new(HubDirectory::new(backends.hubs.clone(), clock.clone()));

        let (outbox, worker) = notification::channel(
            backends.notifications.clone(),
            users.clone(),
            notifier,
            clock.clone(),
        );

        let presence = Arc::new(PresenceService::new(
            backends.checkins.clone(),
            hubs.clone(),
            outbox.clone(),
            clock.clone(),
            settings.presence.clone(),
        ));

        let chats = Arc::new(ChatService::new(
            backends.chats.clone(),
            backends.messages.clone(),
            users.clone(),
            clock.clone(),
            settings.messaging.clone(),
        ));

        let matches = Arc::new(MatchService::new(
            users.clone(),
            hubs.clone(),
            presence.clone(),
            chats.clone(),
            backends.actions.clone(),
            outbox.clone(),
            clock.clone(),
            settings.matching.clone(),
        ));

        let notifications = Arc::new(NotificationService::new(
            backends.notifications.clone(),
            clock,
        ));

        (
            Self {
                users,
                hubs,
                presence,
                matches,
                chats,
                notifications,
                outbox,
                backends: backends.clone(),
            },
            worker,
        )
    }
}
