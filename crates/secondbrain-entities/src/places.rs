//! Places lookup/creation/enrichment service (C4), grounded on
//! `examples/original_source/src/assistant/services/places.py`.

use secondbrain_core::ids::PlaceId;
use secondbrain_core::records::Place;
use secondbrain_core::types::PlaceType;
use secondbrain_kb::KnowledgeBase;

use crate::cache::NameCache;
use crate::confidence::{disambiguate, Candidate};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub enum MatchedBy {
    Name,
    Address,
    Partial,
    Created,
}

#[derive(Debug, Clone)]
pub struct PlaceMatch {
    pub place_id: PlaceId,
    pub name: String,
    pub confidence: f64,
    pub place_type: PlaceType,
    pub last_visit: Option<String>,
    pub matched_by: MatchedBy,
}

impl Candidate for PlaceMatch {
    fn confidence(&self) -> f64 {
        self.confidence
    }
    fn is_top_priority(&self) -> bool {
        matches!(self.place_type, PlaceType::Home | PlaceType::Office)
    }
    fn recency_key(&self) -> Option<&str> {
        self.last_visit.as_deref()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlaceLookupResult {
    pub found: bool,
    pub place_id: Option<PlaceId>,
    pub matches: Vec<PlaceMatch>,
    pub needs_disambiguation: bool,
    pub is_new: bool,
}

/// Result of a geocoding enrichment attempt (spec §4.4 / §11).
#[derive(Debug, Clone, Default)]
pub struct EnrichmentResult {
    pub success: bool,
    pub address: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub external_place_id: Option<String>,
    pub error: Option<String>,
}

/// Abstraction over the external geocoding provider (Google Maps), so this
/// crate stays free of any HTTP client. No implementation is wired in here —
/// the concrete provider lives behind `secondbrain-processor`'s external
/// service boundary (out of scope for this crate per spec §1).
pub trait GeocodingProvider {
    fn enrich(&self, query: &str) -> Result<EnrichmentResult>;
}

fn calculate_confidence(search: &str, name: &str, address: Option<&str>, place_type: PlaceType) -> (f64, MatchedBy) {
    if search.is_empty() {
        return (0.0, MatchedBy::Partial);
    }

    let name_lower = name.to_lowercase();

    let (mut confidence, matched_by) = if search == name_lower {
        (1.0, MatchedBy::Name)
    } else if name_lower.starts_with(search) {
        (0.9, MatchedBy::Name)
    } else if name_lower.contains(search) {
        (0.7, MatchedBy::Name)
    } else if address.map(|a| a.to_lowercase().contains(search)).unwrap_or(false) {
        (0.6, MatchedBy::Address)
    } else {
        (0.5, MatchedBy::Partial)
    };

    let boost = place_type.priority_rank() as f64 / 1000.0;
    confidence = (confidence + boost).min(1.0);

    (confidence, matched_by)
}

pub struct PlacesService<'a> {
    kb: &'a KnowledgeBase,
    cache: NameCache,
}

impl<'a> PlacesService<'a> {
    pub fn new(kb: &'a KnowledgeBase) -> Self {
        Self { kb, cache: NameCache::new() }
    }

    pub fn lookup(&self, name: &str) -> Result<PlaceLookupResult> {
        let search = name.to_lowercase();
        let places = self.kb.list_places()?;

        let mut matches: Vec<PlaceMatch> = places
            .into_iter()
            .map(|p| {
                let (confidence, matched_by) = calculate_confidence(&search, &p.name, p.address.as_deref(), p.place_type);
                PlaceMatch {
                    place_id: p.id,
                    name: p.name,
                    confidence,
                    place_type: p.place_type,
                    last_visit: p.last_visit,
                    matched_by,
                }
            })
            .filter(|m| m.confidence > 0.0)
            .collect();

        if matches.is_empty() {
            return Ok(PlaceLookupResult { found: false, ..Default::default() });
        }

        let (best_idx, needs_disambiguation) = disambiguate(&mut matches);
        let place_id = matches[best_idx].place_id.clone();
        self.cache.insert(search, place_id.0.clone());

        Ok(PlaceLookupResult {
            found: true,
            place_id: Some(place_id),
            matches,
            needs_disambiguation,
            is_new: false,
        })
    }

    pub fn lookup_or_create(&self, name: &str, place_type: PlaceType, address: Option<String>, notes: Option<String>) -> Result<PlaceLookupResult> {
        let result = self.lookup(name)?;
        if result.found {
            return Ok(result);
        }

        let place = self.create(name, place_type, address, notes)?;
        Ok(PlaceLookupResult {
            found: true,
            place_id: Some(place.id.clone()),
            matches: vec![PlaceMatch {
                place_id: place.id,
                name: place.name,
                confidence: 1.0,
                place_type: place.place_type,
                last_visit: None,
                matched_by: MatchedBy::Created,
            }],
            needs_disambiguation: false,
            is_new: true,
        })
    }

    pub fn create(&self, name: &str, place_type: PlaceType, address: Option<String>, notes: Option<String>) -> Result<Place> {
        let now = chrono::Utc::now().to_rfc3339();
        let place = Place {
            id: PlaceId::new(),
            name: name.to_string(),
            place_type,
            address,
            lat: None,
            lng: None,
            external_place_id: None,
            last_visit: None,
            rating: None,
            notes,
            deleted_at: None,
            created_at: now.clone(),
            last_modified_at: now,
        };
        self.kb.create_place(&place)?;
        self.cache.insert(name.to_lowercase(), place.id.0.clone());
        Ok(place)
    }

    /// Enrich an already-created place with geocoding data, skipping places
    /// that already carry coordinates (spec §4.4: enrich at most once).
    pub fn enrich(&self, place: &mut Place, provider: &dyn GeocodingProvider) -> Result<EnrichmentResult> {
        if place.is_geocoded() {
            return Ok(EnrichmentResult { success: false, error: Some("already geocoded".to_string()), ..Default::default() });
        }

        let query = match &place.address {
            Some(addr) => format!("{}, {addr}", place.name),
            None => place.name.clone(),
        };

        let result = provider.enrich(&query)?;
        if result.success {
            place.address = result.address.clone().or_else(|| place.address.clone());
            place.lat = result.lat;
            place.lng = result.lng;
            place.external_place_id = result.external_place_id.clone();
            self.kb.update_place(place)?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_type_breaks_disambiguation_tie() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let service = PlacesService::new(&kb);
        service.create("Office Park", PlaceType::Office, None, None).unwrap();
        service.create("Office Depot", PlaceType::Other, None, None).unwrap();

        let result = service.lookup("Office").unwrap();
        assert!(result.found);
        let best = result.place_id.unwrap();
        let winner = result.matches.iter().find(|m| m.place_id == best).unwrap();
        assert_eq!(winner.place_type, PlaceType::Office);
    }

    #[test]
    fn already_geocoded_place_is_not_re_enriched() {
        let mut place = Place {
            id: PlaceId::new(),
            name: "Home".to_string(),
            place_type: PlaceType::Home,
            address: Some("1 Main St".to_string()),
            lat: Some(1.0),
            lng: Some(2.0),
            external_place_id: None,
            last_visit: None,
            rating: None,
            notes: None,
            deleted_at: None,
            created_at: String::new(),
            last_modified_at: String::new(),
        };
        assert!(place.is_geocoded());

        struct NeverCalled;
        impl GeocodingProvider for NeverCalled {
            fn enrich(&self, _query: &str) -> Result<EnrichmentResult> {
                panic!("should not be called for an already-geocoded place");
            }
        }

        let kb = KnowledgeBase::open_in_memory().unwrap();
        let service = PlacesService::new(&kb);
        let result = service.enrich(&mut place, &NeverCalled).unwrap();
        assert!(!result.success);
    }
}
