use bson::oid::ObjectId;
use creatorhub_db::models::{GeoPoint, Hub};
use std::sync::Arc;

use super::base::{DaoError, DaoResult, Filter, Store};
use crate::clock::Clock;
use crate::geo;

/// Seed/admin-managed hubs.
pub struct HubDirectory {
    store: Arc<dyn Store<Hub>>,
    clock: Arc<dyn Clock>,
}

impl HubDirectory {
    pub fn new(store: Arc<dyn Store<Hub>>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn create(&self, name: String, location: GeoPoint) -> DaoResult<Hub> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(DaoError::Validation("Hub name is required".to_string()));
        }
        if !location.is_valid() {
            return Err(DaoError::Validation("Invalid location".to_string()));
        }

        let hub = Hub {
            id: ObjectId::new(),
            name,
            location,
            created_at: self.clock.now(),
        };
        self.store.insert(&hub).await?;
        Ok(hub)
    }

    pub async fn get(&self, id: ObjectId) -> DaoResult<Option<Hub>> {
        self.store.get(id).await
    }

    pub async fn list(&self) -> DaoResult<Vec<Hub>> {
        self.store.find(&Filter::new()).await
    }

    /// Closest hub to `point`, with its distance in km.
    pub async fn nearest_hub(&self, point: &GeoPoint) -> DaoResult<Option<(Hub, f64)>> {
        let hubs = self.list().await?;
        Ok(hubs
            .into_iter()
            .map(|hub| {
                let distance = geo::haversine_km(point, &hub.location);
                (hub, distance)
            })
            .min_by(|a, b| a.1.total_cmp(&b.1)))
    }
}
