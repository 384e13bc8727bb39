use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use creatorhub_config::PresenceSettings;
use creatorhub_db::models::{Checkin, CheckinStatus, GeoPoint, Hub, NotificationKind};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::{Clock, saturating_after, secs};
use crate::dao::{DaoError, DaoResult, Filter, HubDirectory, Store};
use crate::geo;
use crate::locks::KeyedLocks;
use crate::notification::{NotificationOutbox, NotificationTask};

/// A hub together with the users currently checked in there.
#[derive(Debug, Clone)]
pub struct HubPresence {
    pub hub: Hub,
    pub active_users: Vec<ObjectId>,
}

/// Time-bounded check-ins: one active record per user, swept lazily.
pub struct PresenceService {
    checkins: Arc<dyn Store<Checkin>>,
    hubs: Arc<HubDirectory>,
    outbox: NotificationOutbox,
    clock: Arc<dyn Clock>,
    settings: PresenceSettings,
    user_locks: KeyedLocks<ObjectId>,
    last_alert: DashMap<ObjectId, DateTime<Utc>>,
}

impl PresenceService {
    pub fn new(
        checkins: Arc<dyn Store<Checkin>>,
        hubs: Arc<HubDirectory>,
        outbox: NotificationOutbox,
        clock: Arc<dyn Clock>,
        settings: PresenceSettings,
    ) -> Self {
        Self {
            checkins,
            hubs,
            outbox,
            clock,
            settings,
            user_locks: KeyedLocks::new(),
            last_alert: DashMap::new(),
        }
    }

    /// Replaces any earlier check-in of `user_id`.
    pub async fn checkin(
        &self,
        user_id: ObjectId,
        hub_id: Option<ObjectId>,
        location: GeoPoint,
        status: CheckinStatus,
    ) -> DaoResult<Checkin> {
        if !location.is_valid() {
            return Err(DaoError::Validation("Invalid location".to_string()));
        }

        let hub_id = match hub_id {
            Some(id) => {
                self.hubs
                    .get(id)
                    .await?
                    .ok_or_else(|| DaoError::Validation("Hub not found".to_string()))?;
                Some(id)
            }
            None => self.nearby_hub(&location).await?,
        };

        let now = self.clock.now();
        let checkin = Checkin {
            id: ObjectId::new(),
            user_id,
            hub_id,
            location,
            status,
            created_at: now,
            expires_at: saturating_after(now, self.settings.checkin_ttl_secs),
        };

        {
            let _guard = self.user_locks.lock(user_id).await;
            self.remove_user_checkins(user_id).await?;
            self.checkins.insert(&checkin).await?;
        }
        info!(?user_id, hub_id = ?checkin.hub_id, "Checked in");

        if let (Some(hub_id), CheckinStatus::Online) = (checkin.hub_id, status) {
            if let Err(e) = self.maybe_alert(hub_id, now).await {
                warn!(?hub_id, %e, "Hub density alert skipped");
            }
        }

        Ok(checkin)
    }

    /// Ends the user's presence. Returns false when there was none.
    pub async fn checkout(&self, user_id: ObjectId) -> DaoResult<bool> {
        let _guard = self.user_locks.lock(user_id).await;
        let removed = self.remove_user_checkins(user_id).await?;
        if removed > 0 {
            info!(?user_id, "Checked out");
        }
        Ok(removed > 0)
    }

    async fn remove_user_checkins(&self, user_id: ObjectId) -> DaoResult<u64> {
        let ids: Vec<ObjectId> = self
            .checkins
            .find(&Filter::new().eq("user_id", user_id))
            .await?
            .iter()
            .map(|c| c.id)
            .collect();
        self.checkins.delete(&ids).await
    }

    async fn nearby_hub(&self, location: &GeoPoint) -> DaoResult<Option<ObjectId>> {
        Ok(self
            .hubs
            .nearest_hub(location)
            .await?
            .filter(|(_, distance)| *distance <= self.settings.auto_hub_radius_km)
            .map(|(hub, _)| hub.id))
    }

    /// Sweeps expired check-ins, then returns the rest, closest first when a
    /// reference point is given.
    pub async fn list_active(&self, near: Option<GeoPoint>) -> DaoResult<Vec<Checkin>> {
        let now = self.clock.now();
        let all = self.checkins.find(&Filter::new()).await?;

        let (active, expired): (Vec<Checkin>, Vec<Checkin>) =
            all.into_iter().partition(|c| c.is_active(now));
        if !expired.is_empty() {
            let ids: Vec<ObjectId> = expired.iter().map(|c| c.id).collect();
            let swept = self.checkins.delete(&ids).await?;
            debug!(swept, "Expired check-ins swept");
        }

        // A replace interrupted by an outage can leave two rows for one user.
        let mut latest: HashMap<ObjectId, Checkin> = HashMap::new();
        for checkin in active {
            match latest.get(&checkin.user_id) {
                Some(current) if current.created_at >= checkin.created_at => {}
                _ => {
                    latest.insert(checkin.user_id, checkin);
                }
            }
        }
        let mut active: Vec<Checkin> = latest.into_values().collect();

        match near {
            Some(point) => active.sort_by(|a, b| {
                geo::haversine_km(&point, &a.location)
                    .total_cmp(&geo::haversine_km(&point, &b.location))
                    .then(a.id.cmp(&b.id))
            }),
            None => active.sort_by_key(|c| c.id),
        }
        Ok(active)
    }

    pub async fn active_for_user(&self, user_id: ObjectId) -> DaoResult<Option<Checkin>> {
        let now = self.clock.now();
        Ok(self
            .checkins
            .find(&Filter::new().eq("user_id", user_id))
            .await?
            .into_iter()
            .filter(|c| c.is_active(now))
            .max_by_key(|c| c.created_at))
    }

    /// `user -> hub` for every online user currently at a hub.
    pub async fn user_hubs(&self) -> DaoResult<HashMap<ObjectId, ObjectId>> {
        Ok(self
            .list_active(None)
            .await?
            .into_iter()
            .filter(|c| c.status == CheckinStatus::Online)
            .filter_map(|c| c.hub_id.map(|hub_id| (c.user_id, hub_id)))
            .collect())
    }

    /// Every hub with its derived active users.
    pub async fn hub_occupancy(&self) -> DaoResult<Vec<HubPresence>> {
        let user_hubs = self.user_hubs().await?;
        let mut by_hub: HashMap<ObjectId, Vec<ObjectId>> = HashMap::new();
        for (user_id, hub_id) in user_hubs {
            by_hub.entry(hub_id).or_default().push(user_id);
        }

        Ok(self
            .hubs
            .list()
            .await?
            .into_iter()
            .map(|hub| {
                let mut active_users = by_hub.remove(&hub.id).unwrap_or_default();
                active_users.sort();
                HubPresence { hub, active_users }
            })
            .collect())
    }

    async fn maybe_alert(&self, hub_id: ObjectId, now: DateTime<Utc>) -> DaoResult<()> {
        let at_hub: Vec<ObjectId> = self
            .checkins
            .find(&Filter::new().eq("hub_id", hub_id))
            .await?
            .into_iter()
            .filter(|c| c.is_active(now) && c.status == CheckinStatus::Online)
            .map(|c| c.user_id)
            .collect();

        if at_hub.len() < self.settings.hub_alert_threshold {
            return Ok(());
        }

        let cooldown = secs(self.settings.hub_alert_cooldown_secs);
        let fire = match self.last_alert.entry(hub_id) {
            Entry::Occupied(mut last) => {
                if now - *last.get() >= cooldown {
                    last.insert(now);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
        };
        if !fire {
            debug!(?hub_id, "Hub alert suppressed by cooldown");
            return Ok(());
        }

        let hub_name = match self.hubs.get(hub_id).await? {
            Some(hub) => hub.name,
            None => return Ok(()),
        };
        info!(?hub_id, count = at_hub.len(), "Hub density alert");

        for user_id in &at_hub {
            self.outbox.enqueue(NotificationTask {
                user_id: *user_id,
                kind: NotificationKind::HubAlert,
                title: format!("{hub_name} is buzzing"),
                body: Some(format!("{} creators are checked in right now", at_hub.len())),
                link: Some(format!("/hubs/{}", hub_id.to_hex())),
                metadata: serde_json::json!({
                    "hub_id": hub_id.to_hex(),
                    "active_count": at_hub.len(),
                }),
                dedupe_key: format!("hub:{}:{}", hub_id.to_hex(), now.timestamp_millis()),
            });
        }
        Ok(())
    }
}
