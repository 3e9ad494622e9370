//! Proximity subservice (spec §4.11): "what can I do near X" / "tasks near
//! …" queries. Geocodes the query location, pages through active tasks with
//! an associated place, computes Haversine distance server-side, drops
//! anything beyond a max radius, and renders a bulleted list sorted nearest
//! first. Grounded on `services/proximity.py`'s `ProximityTaskService`
//! (pattern detection, Haversine formula, max-radius filter, sorted
//! rendering); the optional travel-time annotation from that original is
//! left as a hook (`TravelTimeProvider`) with no implementation wired in,
//! since a maps client is an external collaborator outside this crate's
//! scope.

use std::sync::OnceLock;

use regex::RegexSet;

use secondbrain_entities::places::GeocodingProvider;
use secondbrain_kb::KnowledgeBase;

use crate::error::Result;

/// Meters beyond which a task is dropped from proximity results.
pub const MAX_NEARBY_DISTANCE_METERS: f64 = 5000.0;
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;
const MAX_RESULTS: usize = 10;

fn proximity_patterns() -> &'static RegexSet {
    static RE: OnceLock<RegexSet> = OnceLock::new();
    RE.get_or_init(|| {
        RegexSet::new([
            r"(?i)\bnear\s+(?:me|here|.+)$",
            r"(?i)^what can i do near\b",
            r"(?i)\btasks?\s+near\b",
            r"(?i)\bnearby\b",
            r"(?i)\bclose to\s+.+$",
        ])
        .unwrap()
    })
}

/// `true` if `text` reads as a proximity query.
pub fn is_proximity_query(text: &str) -> bool {
    proximity_patterns().is_match(text)
}

/// Best-effort extraction of the location phrase from a proximity query —
/// the text after the last "near"/"close to", trimmed of trailing
/// punctuation. Falls back to the full text when no anchor word is found.
pub fn extract_location_from_query(text: &str) -> String {
    let lower = text.to_lowercase();
    for anchor in ["close to", "near"] {
        if let Some(idx) = lower.rfind(anchor) {
            let rest = text[idx + anchor.len()..].trim();
            let rest = rest.trim_end_matches(['.', '?', '!']);
            if !rest.is_empty() && !rest.eq_ignore_ascii_case("me") && !rest.eq_ignore_ascii_case("here") {
                return rest.to_string();
            }
        }
    }
    text.trim().to_string()
}

/// One task found within the search radius, with its distance from the
/// query location already resolved.
#[derive(Debug, Clone)]
pub struct NearbyTask {
    pub title: String,
    pub place_name: String,
    pub distance_meters: f64,
}

impl NearbyTask {
    pub fn distance_display(&self) -> String {
        if self.distance_meters < 1000.0 {
            format!("{:.0} m", self.distance_meters)
        } else {
            format!("{:.1} km", self.distance_meters / 1000.0)
        }
    }
}

/// Haversine great-circle distance between two lat/lng points, in meters.
pub fn haversine_meters(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let (lat1, lat2) = (lat1.to_radians(), lat2.to_radians());
    let d_lat = lat2 - lat1;
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_METERS * c
}

/// Finds active, place-linked tasks within `max_radius_meters` of the
/// geocoded query location, nearest first.
pub fn find_tasks_near(
    kb: &KnowledgeBase,
    provider: &dyn GeocodingProvider,
    query_location: &str,
    max_radius_meters: f64,
) -> Result<Vec<NearbyTask>> {
    let origin = provider.enrich(query_location)?;
    let (Some(lat), Some(lng)) = (origin.lat, origin.lng) else {
        return Ok(Vec::new());
    };

    let tasks = kb.list_tasks(None, false)?;
    let mut nearby = Vec::new();

    for task in tasks {
        if !task.status.is_active() {
            continue;
        }
        let Some(place_id) = &task.place_id else { continue };
        let Some(place) = kb.get_place(place_id)? else { continue };
        let (Some(place_lat), Some(place_lng)) = (place.lat, place.lng) else { continue };

        let distance = haversine_meters(lat, lng, place_lat, place_lng);
        if distance > max_radius_meters {
            continue;
        }

        nearby.push(NearbyTask { title: task.title, place_name: place.name, distance_meters: distance });
    }

    nearby.sort_by(|a, b| a.distance_meters.partial_cmp(&b.distance_meters).unwrap());
    nearby.truncate(MAX_RESULTS);

    Ok(nearby)
}

/// Renders a bulleted "here's what's nearby" response, or a friendly
/// fallback when nothing is within range.
pub fn render(location: &str, nearby: &[NearbyTask]) -> String {
    if nearby.is_empty() {
        return format!("Nothing on your list near {location}.");
    }

    let mut out = format!("Near {location}:\n");
    for task in nearby {
        out.push_str(&format!("- {} ({}, {})\n", task.title, task.place_name, task.distance_display()));
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_common_proximity_phrasings() {
        assert!(is_proximity_query("what can I do near downtown"));
        assert!(is_proximity_query("tasks near the office"));
        assert!(is_proximity_query("anything nearby?"));
    }

    #[test]
    fn extracts_the_location_phrase() {
        assert_eq!(extract_location_from_query("what can I do near Union Square"), "Union Square");
        assert_eq!(extract_location_from_query("tasks close to the gym"), "the gym");
    }

    #[test]
    fn haversine_zero_distance_for_identical_points() {
        assert_eq!(haversine_meters(37.7749, -122.4194, 37.7749, -122.4194), 0.0);
    }

    #[test]
    fn haversine_roughly_matches_known_distance() {
        // San Francisco to Oakland, ~13 km.
        let d = haversine_meters(37.7749, -122.4194, 37.8044, -122.2711);
        assert!((10_000.0..16_000.0).contains(&d));
    }
}
