pub mod notifier;

use bson::oid::ObjectId;
use creatorhub_db::models::{NotificationEntry, NotificationKind};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::dao::{DaoError, DaoResult, Filter, PaginatedResult, PaginationParams, Store, UserDirectory};

pub use notifier::{LogNotifier, Notifier, NotifyError, WebhookNotifier};

/// A user-facing alert waiting to be persisted and delivered.
#[derive(Debug, Clone)]
pub struct NotificationTask {
    pub user_id: ObjectId,
    pub kind: NotificationKind,
    pub title: String,
    pub body: Option<String>,
    pub link: Option<String>,
    pub metadata: serde_json::Value,
    /// Same key for the same source event; repeats are dropped.
    pub dedupe_key: String,
}

enum Job {
    Deliver(NotificationTask),
    Flush(oneshot::Sender<()>),
}

/// Producer side of the notification queue. Enqueueing never fails the
/// caller's operation.
#[derive(Clone)]
pub struct NotificationOutbox {
    tx: mpsc::UnboundedSender<Job>,
}

impl NotificationOutbox {
    pub fn enqueue(&self, task: NotificationTask) {
        let user_id = task.user_id;
        if self.tx.send(Job::Deliver(task)).is_err() {
            warn!(?user_id, "Notification worker stopped, dropping notification");
        }
    }

    /// Resolves once every job queued before this call has been handled.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Job::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

/// Consumer side: persists each task once per dedupe key, then hands it to
/// the delivery collaborator.
pub struct NotificationWorker {
    rx: mpsc::UnboundedReceiver<Job>,
    store: Arc<dyn Store<NotificationEntry>>,
    users: Arc<UserDirectory>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

pub fn channel(
    store: Arc<dyn Store<NotificationEntry>>,
    users: Arc<UserDirectory>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
) -> (NotificationOutbox, NotificationWorker) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        NotificationOutbox { tx },
        NotificationWorker {
            rx,
            store,
            users,
            notifier,
            clock,
        },
    )
}

impl NotificationWorker {
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        while let Some(job) = self.rx.recv().await {
            match job {
                Job::Deliver(task) => self.process(task).await,
                Job::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
        info!("Notification worker stopped");
    }

    async fn process(&self, task: NotificationTask) {
        let entry = match self.persist(task).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return,
            Err(e) => {
                warn!(%e, "Failed to persist notification");
                return;
            }
        };

        match self.users.get(entry.user_id).await {
            Ok(Some(user)) => {
                if let Err(e) = self.notifier.deliver(&user, &entry).await {
                    warn!(user_id = ?entry.user_id, %e, "Notification delivery failed");
                }
            }
            Ok(None) => debug!(user_id = ?entry.user_id, "Recipient gone, skipping delivery"),
            Err(e) => warn!(user_id = ?entry.user_id, %e, "Recipient lookup failed"),
        }
    }

    async fn persist(&self, task: NotificationTask) -> DaoResult<Option<NotificationEntry>> {
        let existing = self
            .store
            .find(
                &Filter::new()
                    .eq("user_id", task.user_id)
                    .eq("dedupe_key", task.dedupe_key.as_str()),
            )
            .await?;
        if !existing.is_empty() {
            debug!(user_id = ?task.user_id, key = %task.dedupe_key, "Duplicate notification dropped");
            return Ok(None);
        }

        let entry = NotificationEntry {
            id: ObjectId::new(),
            user_id: task.user_id,
            kind: task.kind,
            title: task.title,
            body: task.body,
            link: task.link,
            metadata: task.metadata,
            dedupe_key: task.dedupe_key,
            created_at: self.clock.now(),
            read_at: None,
        };

        match self.store.insert(&entry).await {
            Ok(()) => Ok(Some(entry)),
            Err(DaoError::DuplicateKey(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Recipient-facing reads and read markers.
pub struct NotificationService {
    store: Arc<dyn Store<NotificationEntry>>,
    clock: Arc<dyn Clock>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn Store<NotificationEntry>>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    async fn all_for_user(&self, user_id: ObjectId) -> DaoResult<Vec<NotificationEntry>> {
        let mut entries = self.store.find(&Filter::new().eq("user_id", user_id)).await?;
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(entries)
    }

    /// Newest first.
    pub async fn list_for_user(
        &self,
        user_id: ObjectId,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<NotificationEntry>> {
        Ok(PaginatedResult::from_sorted(
            self.all_for_user(user_id).await?,
            params,
        ))
    }

    pub async fn unread_count(&self, user_id: ObjectId) -> DaoResult<usize> {
        Ok(self
            .all_for_user(user_id)
            .await?
            .iter()
            .filter(|n| !n.is_read())
            .count())
    }

    pub async fn mark_read(
        &self,
        notification_id: ObjectId,
        user_id: ObjectId,
    ) -> DaoResult<NotificationEntry> {
        let mut entry = self
            .store
            .get(notification_id)
            .await?
            .ok_or(DaoError::NotFound)?;
        if entry.user_id != user_id {
            return Err(DaoError::Forbidden("Not your notification".to_string()));
        }
        if entry.read_at.is_none() {
            entry.read_at = Some(self.clock.now());
            self.store.upsert(&entry).await?;
        }
        Ok(entry)
    }

    pub async fn mark_all_read(&self, user_id: ObjectId) -> DaoResult<usize> {
        let now = self.clock.now();
        let mut marked = 0;
        for mut entry in self.all_for_user(user_id).await? {
            if entry.read_at.is_none() {
                entry.read_at = Some(now);
                self.store.upsert(&entry).await?;
                marked += 1;
            }
        }
        Ok(marked)
    }
}
