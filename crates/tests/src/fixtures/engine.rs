use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use creatorhub_config::Settings;
use creatorhub_db::models::{
    Chat, ChatMessage, Checkin, Hub, MatchAction, NotificationEntry, NotificationKind, User,
};
use creatorhub_services::chat::{ChatEvent, ChatService, Subscription};
use creatorhub_services::dao::{FallbackStore, MemoryStore, Store};
use creatorhub_services::notification::{Notifier, NotifyError};
use creatorhub_services::{Backends, Core, ManualClock};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use super::flaky::{FlakyStore, Outage};

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

/// Remembers every delivery; can be told to fail.
#[derive(Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<(bson::oid::ObjectId, NotificationKind)>>,
    pub failing: AtomicBool,
}

impl RecordingNotifier {
    pub async fn deliveries(&self) -> Vec<(bson::oid::ObjectId, NotificationKind)> {
        self.delivered.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, user: &User, entry: &NotificationEntry) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::NoChannel);
        }
        self.delivered.lock().await.push((user.id, entry.kind));
        Ok(())
    }
}

/// The durable halves behind an engine's fallback stores.
pub struct DurableStores {
    pub users: Arc<MemoryStore<User>>,
    pub checkins: Arc<MemoryStore<Checkin>>,
    pub actions: Arc<MemoryStore<MatchAction>>,
    pub chats: Arc<MemoryStore<Chat>>,
    pub messages: Arc<MemoryStore<ChatMessage>>,
    pub notifications: Arc<MemoryStore<NotificationEntry>>,
}

/// Engine over in-process stores with a manual clock.
pub struct TestEngine {
    pub core: Core,
    pub clock: Arc<ManualClock>,
    pub settings: Settings,
    pub notifier: Arc<RecordingNotifier>,
    pub outage: Outage,
    pub durable: Option<DurableStores>,
    _worker: JoinHandle<()>,
}

fn flaky<T: creatorhub_db::Entity>(
    outage: &Outage,
    unique: &'static [&'static str],
) -> (Arc<dyn Store<T>>, Arc<MemoryStore<T>>) {
    let durable = Arc::new(MemoryStore::<T>::with_unique(unique));
    let store = FallbackStore::with_mirror(
        Arc::new(FlakyStore::new(durable.clone(), outage.clone())),
        MemoryStore::with_unique(unique),
    );
    (Arc::new(store), durable)
}

impl TestEngine {
    pub fn new() -> Self {
        Self::with_settings(|_| {})
    }

    pub fn with_settings(mutator: impl FnOnce(&mut Settings)) -> Self {
        Self::build(Backends::in_memory(), None, Outage::default(), mutator)
    }

    /// Runs on caller-assembled stores.
    pub fn with_backends(backends: Backends, mutator: impl FnOnce(&mut Settings)) -> Self {
        Self::build(backends, None, Outage::default(), mutator)
    }

    /// Every collection sits behind a fallback store whose durable side can
    /// be taken offline with [`Outage::start`].
    pub fn flaky() -> Self {
        let outage = Outage::default();
        let (users, users_durable) = flaky::<User>(&outage, &[]);
        let (checkins, checkins_durable) = flaky::<Checkin>(&outage, &[]);
        let (actions, actions_durable) = flaky::<MatchAction>(&outage, &["user_id", "target_id"]);
        let (chats, chats_durable) = flaky::<Chat>(&outage, &["direct_key"]);
        let (messages, messages_durable) = flaky::<ChatMessage>(&outage, &[]);
        let (notifications, notifications_durable) =
            flaky::<NotificationEntry>(&outage, &["user_id", "dedupe_key"]);
        let (hubs, _) = flaky::<Hub>(&outage, &[]);

        let backends = Backends {
            users,
            hubs,
            checkins,
            actions,
            chats,
            messages,
            notifications,
        };
        let durable = DurableStores {
            users: users_durable,
            checkins: checkins_durable,
            actions: actions_durable,
            chats: chats_durable,
            messages: messages_durable,
            notifications: notifications_durable,
        };
        Self::build(backends, Some(durable), outage, |_| {})
    }

    fn build(
        backends: Backends,
        durable: Option<DurableStores>,
        outage: Outage,
        mutator: impl FnOnce(&mut Settings),
    ) -> Self {
        let mut settings = Settings::for_tests().expect("default settings");
        mutator(&mut settings);

        let clock = Arc::new(ManualClock::new(start_time()));
        let notifier = Arc::new(RecordingNotifier::default());
        let (core, worker) = Core::build(&backends, &settings, clock.clone(), notifier.clone());

        Self {
            core,
            clock,
            settings,
            notifier,
            outage,
            durable,
            _worker: worker.spawn(),
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        self.clock.advance(chrono::Duration::seconds(secs));
    }

    /// Waits until queued notifications are persisted and delivered.
    pub async fn settle(&self) {
        self.core.outbox.flush().await;
    }
}

impl Default for TestEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Collects bus events for later inspection.
pub struct EventLog {
    rx: mpsc::UnboundedReceiver<ChatEvent>,
    _subscription: Subscription,
}

impl EventLog {
    pub fn attach(chats: &ChatService) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = chats.subscribe(move |event| {
            let _ = tx.send(event.clone());
        });
        Self {
            rx,
            _subscription: subscription,
        }
    }

    pub fn drain(&mut self) -> Vec<ChatEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn names(&mut self) -> Vec<&'static str> {
        self.drain().iter().map(|e| e.kind.name()).collect()
    }
}
