//! People lookup/creation service (C4), grounded on
//! `examples/original_source/src/assistant/services/people.py`.

use secondbrain_core::ids::PersonId;
use secondbrain_core::records::Person;
use secondbrain_core::types::Relationship;
use secondbrain_kb::KnowledgeBase;

use crate::cache::NameCache;
use crate::confidence::{disambiguate, Candidate};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub enum MatchedBy {
    Name,
    Alias,
    Partial,
    Created,
}

#[derive(Debug, Clone)]
pub struct PersonMatch {
    pub person_id: PersonId,
    pub name: String,
    pub confidence: f64,
    pub relationship: Option<Relationship>,
    pub last_contact: Option<String>,
    pub matched_by: MatchedBy,
}

impl Candidate for PersonMatch {
    fn confidence(&self) -> f64 {
        self.confidence
    }
    fn is_top_priority(&self) -> bool {
        matches!(self.relationship, Some(Relationship::Partner) | Some(Relationship::Family))
    }
    fn recency_key(&self) -> Option<&str> {
        self.last_contact.as_deref()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PersonLookupResult {
    pub found: bool,
    pub person_id: Option<PersonId>,
    pub matches: Vec<PersonMatch>,
    pub needs_disambiguation: bool,
    pub is_new: bool,
}

impl PersonLookupResult {
    pub fn has_single_match(&self) -> bool {
        self.found && self.matches.len() == 1
    }
}

/// Exact=1.0, starts-with=0.9, contains=0.7, alias exact=0.95, alias
/// starts-with=0.85, alias contains=0.6, else partial=0.5; plus a small
/// boost (`priority_rank / 1000`) for close relationships (spec §4.4).
fn calculate_confidence(search: &str, name: &str, aliases: &[String], relationship: Option<Relationship>) -> (f64, MatchedBy) {
    if search.is_empty() {
        return (0.0, MatchedBy::Partial);
    }

    let name_lower = name.to_lowercase();

    let (mut confidence, mut matched_by) = if search == name_lower {
        (1.0, MatchedBy::Name)
    } else if name_lower.starts_with(search) {
        (0.9, MatchedBy::Name)
    } else if name_lower.contains(search) {
        (0.7, MatchedBy::Name)
    } else {
        let mut alias_confidence = 0.0_f64;
        for alias in aliases {
            let alias_lower = alias.to_lowercase();
            if search == alias_lower {
                alias_confidence = 0.95;
                break;
            } else if alias_lower.starts_with(search) {
                alias_confidence = alias_confidence.max(0.85);
            } else if alias_lower.contains(search) {
                alias_confidence = alias_confidence.max(0.6);
            }
        }
        if alias_confidence > 0.0 {
            (alias_confidence, MatchedBy::Alias)
        } else {
            (0.5, MatchedBy::Partial)
        }
    };

    if let Some(rel) = relationship {
        let boost = rel.priority_rank() as f64 / 1000.0;
        confidence = (confidence + boost).min(1.0);
    }

    (confidence, matched_by)
}

/// Looks up, creates and disambiguates People records against the
/// knowledge base.
pub struct PeopleService<'a> {
    kb: &'a KnowledgeBase,
    cache: NameCache,
}

impl<'a> PeopleService<'a> {
    pub fn new(kb: &'a KnowledgeBase) -> Self {
        Self { kb, cache: NameCache::new() }
    }

    pub fn lookup(&self, name: &str) -> Result<PersonLookupResult> {
        let search = name.to_lowercase();
        let people = self.kb.list_people()?;

        let mut matches: Vec<PersonMatch> = people
            .into_iter()
            .map(|p| {
                let (confidence, matched_by) = calculate_confidence(&search, &p.name, &p.aliases, p.relationship);
                PersonMatch {
                    person_id: p.id,
                    name: p.name,
                    confidence,
                    relationship: p.relationship,
                    last_contact: p.last_contact,
                    matched_by,
                }
            })
            .filter(|m| m.confidence > 0.0)
            .collect();

        if matches.is_empty() {
            return Ok(PersonLookupResult { found: false, ..Default::default() });
        }

        let (best_idx, needs_disambiguation) = disambiguate(&mut matches);
        let person_id = matches[best_idx].person_id.clone();
        self.cache.insert(search, person_id.0.clone());

        Ok(PersonLookupResult {
            found: true,
            person_id: Some(person_id),
            matches,
            needs_disambiguation,
            is_new: false,
        })
    }

    pub fn lookup_or_create(&self, name: &str, relationship: Option<Relationship>, notes: Option<String>) -> Result<PersonLookupResult> {
        let result = self.lookup(name)?;
        if result.found {
            return Ok(result);
        }

        let person = self.create(name, relationship, notes)?;
        Ok(PersonLookupResult {
            found: true,
            person_id: Some(person.id.clone()),
            matches: vec![PersonMatch {
                person_id: person.id,
                name: person.name,
                confidence: 1.0,
                relationship: person.relationship,
                last_contact: None,
                matched_by: MatchedBy::Created,
            }],
            needs_disambiguation: false,
            is_new: true,
        })
    }

    pub fn create(&self, name: &str, relationship: Option<Relationship>, notes: Option<String>) -> Result<Person> {
        let now = chrono::Utc::now().to_rfc3339();
        let person = Person {
            id: PersonId::new(),
            name: name.to_string(),
            aliases: vec![],
            relationship,
            last_contact: None,
            notes,
            deleted_at: None,
            created_at: now.clone(),
            last_modified_at: now,
        };
        self.kb.create_person(&person)?;
        self.cache.insert(name.to_lowercase(), person.id.0.clone());
        Ok(person)
    }

    pub fn update_last_contact(&self, id: &PersonId) -> Result<()> {
        self.kb.update_last_contact(id, &chrono::Utc::now().to_rfc3339())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_name_match_wins_outright() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let service = PeopleService::new(&kb);
        service.create("Sarah Chen", Some(Relationship::Friend), None).unwrap();

        let result = service.lookup("Sarah Chen").unwrap();
        assert!(result.found);
        assert!(!result.needs_disambiguation);
    }

    #[test]
    fn unknown_name_creates_on_lookup_or_create() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let service = PeopleService::new(&kb);

        let result = service.lookup_or_create("Jordan", None, None).unwrap();
        assert!(result.is_new);
        assert!(result.found);
    }

    #[test]
    fn ambiguous_partial_matches_flag_disambiguation() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let service = PeopleService::new(&kb);
        service.create("Alexandra Brooks", None, None).unwrap();
        service.create("Alexandra Pierce", None, None).unwrap();

        // "lex" is a substring of both names (0.7 confidence each), below
        // the 0.9 short-circuit and with no relationship to break the tie.
        let result = service.lookup("lex").unwrap();
        assert!(result.needs_disambiguation);
        assert_eq!(result.matches.len(), 2);
    }
}
