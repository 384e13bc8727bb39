use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};

/// A persisted record addressable by the same key in MongoDB and in the
/// in-process mirror.
pub trait Entity: Clone + Serialize + DeserializeOwned + Unpin + Send + Sync + 'static {
    const COLLECTION: &'static str;

    fn id(&self) -> ObjectId;

    /// Time of the last write of any kind. Newest wins on reconciliation.
    fn revision(&self) -> DateTime<Utc>;
}
