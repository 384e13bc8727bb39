use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use creatorhub_db::Entity;
use futures::TryStreamExt;
use mongodb::{Collection, Database};
use tracing::debug;

use super::base::{DaoError, DaoResult, Filter, Store};

/// Durable store backed by one MongoDB collection.
pub struct MongoStore<T: Entity> {
    collection: Collection<T>,
}

impl<T: Entity> MongoStore<T> {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<T>(T::COLLECTION),
        }
    }

    pub fn collection(&self) -> &Collection<T> {
        &self.collection
    }
}

fn map_write_error(e: mongodb::error::Error) -> DaoError {
    if let mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(
        ref write_error,
    )) = *e.kind
    {
        if write_error.code == 11000 {
            return DaoError::DuplicateKey(write_error.message.clone());
        }
    }
    DaoError::Mongo(e)
}

#[async_trait]
impl<T: Entity> Store<T> for MongoStore<T> {
    async fn get(&self, id: ObjectId) -> DaoResult<Option<T>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn find(&self, filter: &Filter) -> DaoResult<Vec<T>> {
        let mut cursor = self
            .collection
            .find(filter.to_document())
            .sort(doc! { "_id": 1 })
            .await?;

        let mut results = Vec::new();
        while let Some(doc) = cursor.try_next().await? {
            results.push(doc);
        }
        Ok(results)
    }

    async fn insert(&self, item: &T) -> DaoResult<()> {
        self.collection
            .insert_one(item)
            .await
            .map_err(map_write_error)?;
        debug!(collection = T::COLLECTION, id = ?item.id(), "Inserted document");
        Ok(())
    }

    async fn upsert(&self, item: &T) -> DaoResult<()> {
        self.collection
            .replace_one(doc! { "_id": item.id() }, item)
            .upsert(true)
            .await
            .map_err(map_write_error)?;
        debug!(collection = T::COLLECTION, id = ?item.id(), "Upserted document");
        Ok(())
    }

    async fn delete(&self, ids: &[ObjectId]) -> DaoResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = self
            .collection
            .delete_many(doc! { "_id": { "$in": ids.to_vec() } })
            .await?;
        Ok(result.deleted_count)
    }
}
