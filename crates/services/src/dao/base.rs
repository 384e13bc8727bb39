use async_trait::async_trait;
use bson::{Bson, Document, oid::ObjectId};
use creatorhub_db::Entity;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaoError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),
    #[error("BSON serialization error: {0}")]
    BsonSer(#[from] bson::ser::Error),
    #[error("BSON deserialization error: {0}")]
    BsonDe(#[from] bson::de::Error),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Entity not found")]
    NotFound,
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Validation: {0}")]
    Validation(String),
}

impl DaoError {
    /// Infrastructure failures the fallback mirror absorbs.
    pub fn is_transient(&self) -> bool {
        matches!(self, DaoError::Mongo(_) | DaoError::Unavailable(_))
    }
}

pub type DaoResult<T> = Result<T, DaoError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    50
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResult<T> {
    /// Slices an already ordered result set.
    pub fn from_sorted(items: Vec<T>, params: &PaginationParams) -> Self {
        let page = params.page.max(1);
        let per_page = params.per_page.max(1);
        let total = items.len() as u64;
        let skip = ((page - 1) * per_page) as usize;

        let items: Vec<T> = items
            .into_iter()
            .skip(skip)
            .take(per_page as usize)
            .collect();

        Self {
            items,
            total,
            page,
            per_page,
            total_pages: total.div_ceil(per_page),
        }
    }
}

#[derive(Debug, Clone)]
enum Condition {
    Eq(&'static str, Bson),
    Contains(&'static str, Bson),
}

/// Conjunctive query understood by every store: rendered as a MongoDB
/// filter document, or evaluated in memory against an entity's BSON form.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &'static str, value: impl Into<Bson>) -> Self {
        self.conditions.push(Condition::Eq(field, value.into()));
        self
    }

    /// Array field holds `value`.
    pub fn contains(mut self, field: &'static str, value: impl Into<Bson>) -> Self {
        self.conditions.push(Condition::Contains(field, value.into()));
        self
    }

    pub fn to_document(&self) -> Document {
        let mut clauses: Vec<Document> = self
            .conditions
            .iter()
            .map(|condition| {
                let mut clause = Document::new();
                match condition {
                    Condition::Eq(field, value) => {
                        clause.insert(*field, value.clone());
                    }
                    Condition::Contains(field, value) => {
                        clause.insert(
                            *field,
                            bson::doc! { "$elemMatch": { "$eq": value.clone() } },
                        );
                    }
                }
                clause
            })
            .collect();

        match clauses.len() {
            0 => Document::new(),
            1 => clauses.remove(0),
            _ => bson::doc! { "$and": clauses },
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions.iter().all(|condition| match condition {
            Condition::Eq(field, value) => doc.get(field).unwrap_or(&Bson::Null) == value,
            Condition::Contains(field, value) => {
                matches!(doc.get(field), Some(Bson::Array(items)) if items.contains(value))
            }
        })
    }
}

/// Row-level CRUD over one collection.
#[async_trait]
pub trait Store<T: Entity>: Send + Sync {
    async fn get(&self, id: ObjectId) -> DaoResult<Option<T>>;

    async fn find(&self, filter: &Filter) -> DaoResult<Vec<T>>;

    /// Fails with [`DaoError::DuplicateKey`] on an id or unique-key clash.
    async fn insert(&self, item: &T) -> DaoResult<()>;

    async fn upsert(&self, item: &T) -> DaoResult<()>;

    /// Returns the number of records removed.
    async fn delete(&self, ids: &[ObjectId]) -> DaoResult<u64>;

    /// Writes accepted but not yet confirmed durable.
    fn pending_writes(&self) -> usize {
        0
    }
}
