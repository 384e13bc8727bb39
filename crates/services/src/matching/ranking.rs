use bson::oid::ObjectId;
use creatorhub_config::MatchingSettings;
use creatorhub_db::models::{GeoPoint, Hub, PublicProfile, User};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::geo;

#[derive(Debug, Clone)]
pub struct MatchSuggestion {
    pub profile: PublicProfile,
    pub shared_hub: bool,
    pub hub_id: Option<ObjectId>,
    pub distance_km: Option<f64>,
    pub shared_skills: Vec<String>,
    pub score: f64,
}

/// Inputs the ranking reads; nothing here is mutated.
pub struct RankingInput<'a> {
    pub requester: &'a User,
    pub candidates: &'a [User],
    pub hubs: &'a [Hub],
    /// `user -> hub` for users currently at a hub.
    pub user_hubs: &'a HashMap<ObjectId, ObjectId>,
    /// Targets the requester already acted on.
    pub acted_on: &'a HashSet<ObjectId>,
}

fn effective_location(
    user: &User,
    user_hubs: &HashMap<ObjectId, ObjectId>,
    hubs: &HashMap<ObjectId, &Hub>,
) -> Option<GeoPoint> {
    user_hubs
        .get(&user.id)
        .and_then(|hub_id| hubs.get(hub_id))
        .map(|hub| hub.location)
        .or(user.location)
}

fn shared_skills(a: &User, b: &User) -> Vec<String> {
    let theirs: HashSet<String> = b.skills.iter().map(|s| s.to_lowercase()).collect();
    let mut seen = HashSet::new();
    a.skills
        .iter()
        .map(|s| s.to_lowercase())
        .filter(|s| theirs.contains(s) && seen.insert(s.clone()))
        .collect()
}

/// Shared hub first, then nearest (unknown distance last), then best score.
fn compare(a: &MatchSuggestion, b: &MatchSuggestion) -> Ordering {
    b.shared_hub
        .cmp(&a.shared_hub)
        .then_with(|| {
            let da = a.distance_km.unwrap_or(f64::INFINITY);
            let db = b.distance_km.unwrap_or(f64::INFINITY);
            da.total_cmp(&db)
        })
        .then_with(|| b.score.total_cmp(&a.score))
        .then_with(|| a.profile.id.cmp(&b.profile.id))
}

pub fn rank(input: &RankingInput<'_>, settings: &MatchingSettings) -> Vec<MatchSuggestion> {
    let hubs: HashMap<ObjectId, &Hub> = input.hubs.iter().map(|h| (h.id, h)).collect();
    let requester = input.requester;
    let requester_hub = input.user_hubs.get(&requester.id).copied();
    let requester_location = effective_location(requester, input.user_hubs, &hubs);

    let mut suggestions: Vec<MatchSuggestion> = input
        .candidates
        .iter()
        .filter(|c| c.id != requester.id)
        .filter(|c| !requester.is_connected_to(&c.id))
        .filter(|c| !input.acted_on.contains(&c.id))
        .map(|candidate| {
            let hub_id = input.user_hubs.get(&candidate.id).copied();
            let shared_hub = requester_hub.is_some() && hub_id == requester_hub;
            let distance_km = match (
                requester_location,
                effective_location(candidate, input.user_hubs, &hubs),
            ) {
                (Some(a), Some(b)) => Some(geo::haversine_km(&a, &b)),
                _ => None,
            };
            let shared_skills = shared_skills(requester, candidate);
            let score = if shared_hub { settings.shared_hub_bonus } else { 0.0 }
                + settings.shared_skill_weight * shared_skills.len() as f64
                - distance_km.unwrap_or(settings.missing_distance_km);

            MatchSuggestion {
                profile: candidate.public_profile(),
                shared_hub,
                hub_id,
                distance_km,
                shared_skills,
                score,
            }
        })
        .collect();

    suggestions.sort_by(compare);
    suggestions.truncate(settings.max_suggestions);
    suggestions
}
