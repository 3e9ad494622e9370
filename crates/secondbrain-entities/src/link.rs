//! Relation Linker (C5): ties extracted people/places/projects into a
//! single entity-resolution pass a message processor can call once per
//! inbound capture (spec §4.5), carrying each linked entity's combined
//! confidence (extraction confidence x match confidence) and whether it's
//! newly created, so the orchestrator can decide when a clarification round
//! trip is worth the interruption.

use secondbrain_core::ids::{PersonId, PlaceId, ProjectId};
use secondbrain_core::types::{PlaceType, ProjectType};

use crate::error::Result;
use crate::extract::ExtractedEntities;
use crate::people::PeopleService;
use crate::places::PlacesService;
use crate::projects::ProjectsService;

/// One unresolved mention the caller must ask the user to disambiguate
/// (spec §4.4/§4.13).
#[derive(Debug, Clone)]
pub struct PendingDisambiguation {
    pub mention: String,
    pub kind: MentionKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentionKind {
    Person,
    Place,
    Project,
}

/// One resolved mention of entity kind `Id` (spec §4.5 `LinkedEntity`).
#[derive(Debug, Clone)]
pub struct LinkedEntity<Id> {
    pub id: Id,
    pub name: String,
    /// `extraction_confidence (0.0-1.0) * match_confidence (0.0-1.0)`.
    pub combined_confidence: f64,
    pub is_new: bool,
    pub needs_disambiguation: bool,
}

/// Result of one `RelationLinker::link` pass (spec §4.5 `LinkedRelations`).
#[derive(Debug, Clone, Default)]
pub struct LinkedRelations {
    pub people: Vec<LinkedEntity<PersonId>>,
    pub places: Vec<LinkedEntity<PlaceId>>,
    pub project: Option<LinkedEntity<ProjectId>>,
    pub pending: Vec<PendingDisambiguation>,
    /// `true` if any linked entity needs a disambiguation round trip.
    pub needs_review: bool,
    /// Count of entities auto-created during this pass.
    pub new_count: usize,
}

pub struct RelationLinker<'a> {
    people: &'a PeopleService<'a>,
    places: &'a PlacesService<'a>,
    projects: &'a ProjectsService<'a>,
}

impl<'a> RelationLinker<'a> {
    pub fn new(people: &'a PeopleService<'a>, places: &'a PlacesService<'a>, projects: &'a ProjectsService<'a>) -> Self {
        Self { people, places, projects }
    }

    /// Resolves every extracted person/place mention plus an optional
    /// project mention, auto-creating low-ambiguity new entities and
    /// carrying each one's combined confidence (spec §4.5).
    ///
    /// `project` is `(name, extraction_confidence)` — unlike people/places,
    /// extraction doesn't spot projects from free text, so the caller
    /// supplies whatever project mention it already resolved (an explicit
    /// "for <project>" fragment, confidence 100).
    pub fn link(&self, extracted: &ExtractedEntities, project: Option<(&str, u8)>) -> Result<LinkedRelations> {
        let mut out = LinkedRelations::default();

        for person in &extracted.people {
            let result = self.people.lookup_or_create(&person.name, None, None)?;
            let Some(id) = result.person_id.clone() else { continue };
            let best = result.matches.iter().find(|m| m.person_id == id);
            let match_confidence = best.map(|m| m.confidence).unwrap_or(1.0);

            if result.needs_disambiguation {
                out.pending.push(PendingDisambiguation { mention: person.name.clone(), kind: MentionKind::Person });
            }
            if result.is_new {
                out.new_count += 1;
            }
            out.people.push(LinkedEntity {
                id,
                name: person.name.clone(),
                combined_confidence: (person.confidence as f64 / 100.0) * match_confidence,
                is_new: result.is_new,
                needs_disambiguation: result.needs_disambiguation,
            });
        }

        for place in &extracted.places {
            let result = self.places.lookup_or_create(&place.name, PlaceType::Other, None, None)?;
            let Some(id) = result.place_id.clone() else { continue };
            let best = result.matches.iter().find(|m| m.place_id == id);
            let match_confidence = best.map(|m| m.confidence).unwrap_or(1.0);

            if result.needs_disambiguation {
                out.pending.push(PendingDisambiguation { mention: place.name.clone(), kind: MentionKind::Place });
            }
            if result.is_new {
                out.new_count += 1;
            }
            out.places.push(LinkedEntity {
                id,
                name: place.name.clone(),
                combined_confidence: (place.confidence as f64 / 100.0) * match_confidence,
                is_new: result.is_new,
                needs_disambiguation: result.needs_disambiguation,
            });
        }

        if let Some((name, extraction_confidence)) = project {
            let result = self.projects.lookup_or_create(name, ProjectType::Personal, None)?;
            if let Some(id) = result.project_id.clone() {
                let best = result.matches.iter().find(|m| m.project_id == id);
                let match_confidence = best.map(|m| m.confidence).unwrap_or(1.0);

                if result.needs_disambiguation {
                    out.pending.push(PendingDisambiguation { mention: name.to_string(), kind: MentionKind::Project });
                }
                if result.is_new {
                    out.new_count += 1;
                }
                out.project = Some(LinkedEntity {
                    id,
                    name: name.to_string(),
                    combined_confidence: (extraction_confidence as f64 / 100.0) * match_confidence,
                    is_new: result.is_new,
                    needs_disambiguation: result.needs_disambiguation,
                });
            }
        }

        out.needs_review = !out.pending.is_empty();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{ExtractedPerson, ExtractedPlace};
    use secondbrain_kb::KnowledgeBase;

    #[test]
    fn new_person_is_linked_and_counted_as_new() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let people = PeopleService::new(&kb);
        let places = PlacesService::new(&kb);
        let projects = ProjectsService::new(&kb);
        let linker = RelationLinker::new(&people, &places, &projects);

        let extracted = ExtractedEntities {
            people: vec![ExtractedPerson { name: "Sarah".to_string(), confidence: 90, context: String::new() }],
            places: vec![],
            ..Default::default()
        };

        let linked = linker.link(&extracted, None).unwrap();
        assert_eq!(linked.people.len(), 1);
        assert_eq!(linked.new_count, 1);
        assert!(!linked.needs_review);
        assert!((linked.people[0].combined_confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn every_extracted_place_is_linked_not_just_the_first() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let people = PeopleService::new(&kb);
        let places = PlacesService::new(&kb);
        let projects = ProjectsService::new(&kb);
        let linker = RelationLinker::new(&people, &places, &projects);

        let extracted = ExtractedEntities {
            people: vec![],
            places: vec![
                ExtractedPlace { name: "Starbucks".to_string(), confidence: 80, context: String::new() },
                ExtractedPlace { name: "the old library".to_string(), confidence: 80, context: String::new() },
            ],
            ..Default::default()
        };

        let linked = linker.link(&extracted, None).unwrap();
        assert_eq!(linked.places.len(), 2);
        assert_eq!(linked.new_count, 2);
        assert!(linked.places.iter().any(|p| p.name == "Starbucks"));
        assert!(linked.places.iter().any(|p| p.name == "the old library"));
    }

    #[test]
    fn project_mention_resolves_alongside_people_and_places() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let people = PeopleService::new(&kb);
        let places = PlacesService::new(&kb);
        let projects = ProjectsService::new(&kb);
        let linker = RelationLinker::new(&people, &places, &projects);

        let linked = linker.link(&ExtractedEntities::default(), Some(("Website Launch", 100))).unwrap();
        assert!(linked.project.is_some());
        assert_eq!(linked.project.unwrap().name, "Website Launch");
    }
}
