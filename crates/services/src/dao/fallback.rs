use async_trait::async_trait;
use bson::oid::ObjectId;
use creatorhub_db::Entity;
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use super::base::{DaoError, DaoResult, Filter, Store};
use super::memory::MemoryStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingOp {
    Upsert,
    Delete,
}

/// A write held only in the mirror. The generation tells a replayed write
/// apart from a newer one recorded for the same id while it was in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingWrite {
    op: PendingOp,
    generation: u64,
}

/// Durable store with an in-memory mirror that takes over while the durable
/// side is unreachable.
///
/// Every successful durable write is mirrored. A write that fails with a
/// transient error lands in the mirror only and is remembered as pending;
/// pending writes are replayed after the next successful durable round-trip.
/// Reads merge durable rows into the mirror by id, newest revision winning,
/// so a write the caller saw succeed is never hidden by a stale durable row.
pub struct FallbackStore<T: Entity> {
    durable: Arc<dyn Store<T>>,
    mirror: MemoryStore<T>,
    pending: DashMap<ObjectId, PendingWrite>,
    generation: AtomicU64,
}

impl<T: Entity> FallbackStore<T> {
    pub fn new(durable: Arc<dyn Store<T>>) -> Self {
        Self::with_mirror(durable, MemoryStore::new())
    }

    pub fn with_mirror(durable: Arc<dyn Store<T>>, mirror: MemoryStore<T>) -> Self {
        Self {
            durable,
            mirror,
            pending: DashMap::new(),
            generation: AtomicU64::new(0),
        }
    }

    fn mark_pending(&self, id: ObjectId, op: PendingOp) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        self.pending.insert(id, PendingWrite { op, generation });
    }

    fn degrade(&self, op: &'static str, e: &DaoError) {
        warn!(
            collection = T::COLLECTION,
            op,
            %e,
            "Durable store failed, using in-memory mirror"
        );
    }

    /// Mirror row unless the durable one is strictly newer.
    fn reconcile(&self, durable: T) -> T {
        if let Some(local) = self.mirror.get_local(&durable.id()) {
            if local.revision() > durable.revision() {
                return local;
            }
        }
        self.mirror.put_local(durable.clone());
        durable
    }

    async fn replay_pending(&self) {
        let snapshot: Vec<(ObjectId, PendingWrite)> = self
            .pending
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();

        for (id, write) in snapshot {
            let replayed = match write.op {
                PendingOp::Upsert => self.mirror.get_local(&id),
                PendingOp::Delete => None,
            };
            let result = match (write.op, &replayed) {
                (PendingOp::Upsert, Some(item)) => self.durable.upsert(item).await,
                (PendingOp::Upsert, None) => Ok(()),
                (PendingOp::Delete, _) => self.durable.delete(&[id]).await.map(|_| ()),
            };

            match result {
                Ok(()) => {
                    if self.pending.remove_if(&id, |_, current| *current == write).is_some() {
                        debug!(collection = T::COLLECTION, ?id, "Replayed pending write");
                    } else if !self.pending.contains_key(&id) {
                        // Written through while the replay was in flight; the
                        // durable side must not end on the older copy.
                        self.rewrite_if_newer(id, replayed.as_ref()).await;
                    }
                }
                Err(e) if e.is_transient() => {
                    debug!(collection = T::COLLECTION, %e, "Replay deferred");
                    return;
                }
                Err(e) => {
                    warn!(collection = T::COLLECTION, ?id, %e, "Dropping unreplayable write");
                    self.pending.remove_if(&id, |_, current| *current == write);
                }
            }
        }
    }

    async fn rewrite_if_newer(&self, id: ObjectId, replayed: Option<&T>) {
        let (Some(current), Some(replayed)) = (self.mirror.get_local(&id), replayed) else {
            return;
        };
        if current.revision() <= replayed.revision() {
            return;
        }
        if let Err(e) = self.durable.upsert(&current).await {
            if e.is_transient() {
                self.mark_pending(id, PendingOp::Upsert);
            } else {
                warn!(collection = T::COLLECTION, ?id, %e, "Rewrite after replay failed");
            }
        }
    }

    async fn after_success(&self) {
        if !self.pending.is_empty() {
            self.replay_pending().await;
        }
    }
}

#[async_trait]
impl<T: Entity> Store<T> for FallbackStore<T> {
    async fn get(&self, id: ObjectId) -> DaoResult<Option<T>> {
        if let Some(write) = self.pending.get(&id).map(|w| *w) {
            return Ok(match write.op {
                PendingOp::Upsert => self.mirror.get_local(&id),
                PendingOp::Delete => None,
            });
        }

        match self.durable.get(id).await {
            Ok(found) => {
                self.after_success().await;
                Ok(match found {
                    Some(row) => Some(self.reconcile(row)),
                    None => {
                        self.mirror.remove_local(&id);
                        None
                    }
                })
            }
            Err(e) if e.is_transient() => {
                self.degrade("get", &e);
                Ok(self.mirror.get_local(&id))
            }
            Err(e) => Err(e),
        }
    }

    async fn find(&self, filter: &Filter) -> DaoResult<Vec<T>> {
        let rows = match self.durable.find(filter).await {
            Ok(rows) => rows,
            Err(e) if e.is_transient() => {
                self.degrade("find", &e);
                return self.mirror.find_local(filter);
            }
            Err(e) => return Err(e),
        };
        // `rows` predates the replay below, so merge against this snapshot.
        let pending: HashMap<ObjectId, PendingWrite> = self
            .pending
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();
        self.after_success().await;

        let mut seen = HashSet::with_capacity(rows.len());
        let mut merged = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id();
            seen.insert(id);
            if pending.contains_key(&id) {
                continue;
            }
            merged.push(self.reconcile(row));
        }

        for local in self.mirror.find_local(filter)? {
            let id = local.id();
            match pending.get(&id).map(|w| w.op) {
                Some(PendingOp::Upsert) => merged.push(local),
                Some(PendingOp::Delete) => {}
                None if !seen.contains(&id) => {
                    // Gone from the durable side.
                    self.mirror.remove_local(&id);
                }
                None => {}
            }
        }

        merged.sort_by_key(|r| r.id());
        Ok(merged)
    }

    async fn insert(&self, item: &T) -> DaoResult<()> {
        match self.durable.insert(item).await {
            Ok(()) => {
                self.mirror.put_local(item.clone());
                self.pending.remove(&item.id());
                self.after_success().await;
                Ok(())
            }
            Err(e) if e.is_transient() => {
                self.degrade("insert", &e);
                self.mirror.insert(item).await?;
                self.mark_pending(item.id(), PendingOp::Upsert);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn upsert(&self, item: &T) -> DaoResult<()> {
        match self.durable.upsert(item).await {
            Ok(()) => {
                self.mirror.put_local(item.clone());
                self.pending.remove(&item.id());
                self.after_success().await;
                Ok(())
            }
            Err(e) if e.is_transient() => {
                self.degrade("upsert", &e);
                self.mirror.upsert(item).await?;
                self.mark_pending(item.id(), PendingOp::Upsert);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, ids: &[ObjectId]) -> DaoResult<u64> {
        match self.durable.delete(ids).await {
            Ok(removed) => {
                let local = self.mirror.delete(ids).await?;
                for id in ids {
                    self.pending.remove(id);
                }
                self.after_success().await;
                Ok(removed.max(local))
            }
            Err(e) if e.is_transient() => {
                self.degrade("delete", &e);
                let local = self.mirror.delete(ids).await?;
                for id in ids {
                    self.mark_pending(*id, PendingOp::Delete);
                }
                Ok(local)
            }
            Err(e) => Err(e),
        }
    }

    fn pending_writes(&self) -> usize {
        self.pending.len()
    }
}
