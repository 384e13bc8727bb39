use async_trait::async_trait;
use bson::{Bson, oid::ObjectId};
use creatorhub_db::Entity;
use dashmap::DashMap;

use super::base::{DaoError, DaoResult, Filter, Store};

/// In-process store keyed like the durable schema. Serves as the fallback
/// mirror and as the durable backend for tests and local runs.
pub struct MemoryStore<T: Entity> {
    rows: DashMap<ObjectId, T>,
    /// Compound unique key; rows missing any of the fields are exempt.
    unique: &'static [&'static str],
}

impl<T: Entity> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            unique: &[],
        }
    }

    pub fn with_unique(unique: &'static [&'static str]) -> Self {
        Self {
            rows: DashMap::new(),
            unique,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub(crate) fn get_local(&self, id: &ObjectId) -> Option<T> {
        self.rows.get(id).map(|r| r.value().clone())
    }

    pub(crate) fn put_local(&self, item: T) {
        self.rows.insert(item.id(), item);
    }

    pub(crate) fn remove_local(&self, id: &ObjectId) -> bool {
        self.rows.remove(id).is_some()
    }

    pub(crate) fn find_local(&self, filter: &Filter) -> DaoResult<Vec<T>> {
        let mut results = Vec::new();
        for row in self.rows.iter() {
            let doc = bson::to_document(row.value())?;
            if filter.matches(&doc) {
                results.push(row.value().clone());
            }
        }
        results.sort_by_key(|r| r.id());
        Ok(results)
    }

    fn unique_key(&self, item: &T) -> DaoResult<Option<Vec<Bson>>> {
        if self.unique.is_empty() {
            return Ok(None);
        }
        let doc = bson::to_document(item)?;
        let mut key = Vec::with_capacity(self.unique.len());
        for field in self.unique {
            match doc.get(*field) {
                None | Some(Bson::Null) => return Ok(None),
                Some(value) => key.push(value.clone()),
            }
        }
        Ok(Some(key))
    }

    fn check_unique(&self, item: &T) -> DaoResult<()> {
        let Some(key) = self.unique_key(item)? else {
            return Ok(());
        };
        for row in self.rows.iter() {
            if *row.key() == item.id() {
                continue;
            }
            if self.unique_key(row.value())?.as_ref() == Some(&key) {
                return Err(DaoError::DuplicateKey(format!(
                    "{} unique key {:?}",
                    T::COLLECTION,
                    self.unique
                )));
            }
        }
        Ok(())
    }
}

impl<T: Entity> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Entity> Store<T> for MemoryStore<T> {
    async fn get(&self, id: ObjectId) -> DaoResult<Option<T>> {
        Ok(self.get_local(&id))
    }

    async fn find(&self, filter: &Filter) -> DaoResult<Vec<T>> {
        self.find_local(filter)
    }

    async fn insert(&self, item: &T) -> DaoResult<()> {
        if self.rows.contains_key(&item.id()) {
            return Err(DaoError::DuplicateKey(format!(
                "{} _id {}",
                T::COLLECTION,
                item.id()
            )));
        }
        self.check_unique(item)?;
        self.put_local(item.clone());
        Ok(())
    }

    async fn upsert(&self, item: &T) -> DaoResult<()> {
        self.check_unique(item)?;
        self.put_local(item.clone());
        Ok(())
    }

    async fn delete(&self, ids: &[ObjectId]) -> DaoResult<u64> {
        Ok(ids.iter().filter(|id| self.remove_local(id)).count() as u64)
    }
}
