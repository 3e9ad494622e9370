//! Message Processor (C11): the single orchestration point an inbound
//! chat message passes through (spec §4.11). Wires together every other
//! `secondbrain-*` service — idempotency, corrections, entity linking,
//! pattern memory, the knowledge base, the offline queue — without
//! owning any of their state beyond what it needs to carry across a
//! single chat (the correction/soft-delete rings, the pattern cache).
//!
//! Grounded on `examples/original_source/src/assistant/bot.py`'s
//! message-handling dispatch, which runs the same
//! correction → undo → proximity → research → classify cascade before
//! falling through to entity extraction.

pub mod classify;
pub mod email;
pub mod error;
pub mod proximity;
pub mod research;
pub mod response;
pub mod schedule_conflict;
pub mod transcribe;

use std::sync::Mutex;

use chrono::Utc;

use secondbrain_audit::{AuditLogger, IdempotencyCheck, IdempotencyKey};
use secondbrain_core::ids::{PersonId, PlaceId, ProjectId};
use secondbrain_core::records::{InboxItem, Task};
use secondbrain_core::types::{CreatedBy, Priority, Source, TaskStatus};
use secondbrain_corrections::{ActionKind, CorrectionHandler};
use secondbrain_entities::extract;
use secondbrain_entities::link::RelationLinker;
use secondbrain_entities::people::PeopleService;
use secondbrain_entities::places::{GeocodingProvider, PlacesService};
use secondbrain_entities::projects::ProjectsService;
use secondbrain_kb::KnowledgeBase;
use secondbrain_patterns::{PatternApplicator, PatternDetector};
use secondbrain_queue::{OfflineQueue, OFFLINE_RESPONSE};
use secondbrain_softdelete::{EntityType, SoftDeleteService};
use secondbrain_timezone::TimeParser;

use crate::error::Result;
use crate::response::ResponseContext;

/// Minimum extraction confidence below which an inbox item is flagged
/// for clarification rather than treated as settled (spec §4.11 step 6d).
const INBOX_CLARIFICATION_THRESHOLD: u8 = 80;
/// Confidence assigned to a task created from a bare imperative with no
/// parsed date (spec §4.2's mid-tier extraction confidence).
const IMPERATIVE_ONLY_CONFIDENCE: u8 = 70;

/// One inbound message, already unwrapped from its transport envelope.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub text: String,
    pub chat_id: String,
    pub message_id: String,
    pub source: Source,
}

/// The bundle of long-lived, per-process services a message processor
/// owns across every chat. Constructed once by the application binary.
#[derive(Default)]
pub struct MessageProcessor {
    audit: AuditLogger,
    corrections: CorrectionHandler,
    softdelete: SoftDeleteService,
    patterns: Mutex<PatternDetector>,
    applicator: PatternApplicator,
}

impl MessageProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    pub fn corrections(&self) -> &CorrectionHandler {
        &self.corrections
    }

    pub fn softdelete(&self) -> &SoftDeleteService {
        &self.softdelete
    }

    /// Loads the applicable-pattern cache; call once at startup and
    /// again whenever patterns change out from under a long-running
    /// process (spec §5 "Pattern cache").
    pub fn refresh_patterns(&self, kb: &KnowledgeBase) -> Result<usize> {
        Ok(self.applicator.refresh(kb)?)
    }

    /// Runs the full cascade described in spec §4.11 and returns the
    /// reply text for the transport to send back.
    pub fn process(&self, kb: &KnowledgeBase, parser: &TimeParser, geocoder: &dyn GeocodingProvider, queue: &OfflineQueue, envelope: &Envelope) -> Result<String> {
        let key = IdempotencyKey::transport(envelope.source.transport_prefix(), &envelope.chat_id, &envelope.message_id);

        if let IdempotencyCheck::Duplicate { original_log_id } = self.audit.check_idempotency(kb, &key)? {
            self.audit.log_deduplicated(kb, &key, &original_log_id)?;
            return Ok("Got it, already handled that one.".to_string());
        }

        if secondbrain_softdelete::is_undo_command(&envelope.text) {
            let undo = self.softdelete.undo_last_delete(kb, &self.audit, &envelope.chat_id);
            if undo.success {
                return Ok(undo.message);
            }
            // Nothing pending in the soft-delete ring: fall through so
            // "undo" can still mean "undo my last creation" via corrections.
        }

        if secondbrain_softdelete::is_delete_command(&envelope.text) {
            return Ok(self.handle_delete_request(kb, &envelope.chat_id, &envelope.message_id));
        }

        if secondbrain_corrections::is_correction_message(&envelope.text) {
            let mut patterns = self.patterns.lock().expect("pattern detector lock poisoned");
            let result = self.corrections.process_correction(kb, &self.audit, &mut patterns, &envelope.text, &envelope.chat_id, &envelope.message_id);
            return Ok(result.message);
        }

        if proximity::is_proximity_query(&envelope.text) {
            let location = proximity::extract_location_from_query(&envelope.text);
            let nearby = proximity::find_tasks_near(kb, geocoder, &location, proximity::MAX_NEARBY_DISTANCE_METERS)?;
            return Ok(proximity::render(&location, &nearby));
        }

        if research::is_research_request(&envelope.text) {
            // The research pipeline needs a configured `WebResearcher` +
            // `DocStore`; without one wired in, fall through to normal
            // classification rather than silently dropping the message.
            return self.classify_and_create(kb, parser, queue, envelope);
        }

        self.classify_and_create(kb, parser, queue, envelope)
    }

    fn classify_and_create(&self, kb: &KnowledgeBase, parser: &TimeParser, queue: &OfflineQueue, envelope: &Envelope) -> Result<String> {
        let now_utc = Utc::now();
        let mut extracted = extract::extract(&envelope.text, parser, now_utc);
        let project_mention = extract_project_mention(&envelope.text);

        let mut people_names: Vec<String> = extracted.people.iter().map(|p| p.name.clone()).collect();
        let mut place_names: Vec<String> = extracted.places.iter().map(|p| p.name.clone()).collect();
        let mut title = envelope.text.trim().to_string();
        self.applicator.apply(&mut people_names, &mut place_names, &mut title);
        for (person, name) in extracted.people.iter_mut().zip(people_names) {
            person.name = name;
        }
        for (place, name) in extracted.places.iter_mut().zip(place_names) {
            place.name = name;
        }

        let people_svc = PeopleService::new(kb);
        let places_svc = PlacesService::new(kb);
        let projects_svc = ProjectsService::new(kb);
        let linker = RelationLinker::new(&people_svc, &places_svc, &projects_svc);
        let linked = linker.link(&extracted, project_mention.as_ref().map(|(n, c)| (n.as_str(), *c)))?;

        let parsed = extracted.dates.first().cloned();
        let has_date = parsed.is_some();

        let person_ids: Vec<PersonId> = linked.people.iter().map(|p| p.id.clone()).collect();
        let place_id: Option<PlaceId> = linked.places.first().map(|p| p.id.clone());
        let project_id: Option<ProjectId> = linked.project.as_ref().map(|p| p.id.clone());

        let confidence = average_confidence(&linked).unwrap_or(if has_date { 90 } else { IMPERATIVE_ONLY_CONFIDENCE });

        let response = if classify::is_task_like(&title, has_date) {
            self.create_task_and_respond(kb, parser, queue, envelope, &title, parsed, person_ids, place_id, project_id, confidence, &linked)?
        } else {
            self.create_inbox_item_and_respond(kb, queue, envelope, &title, confidence)?
        };

        Ok(response)
    }

    #[allow(clippy::too_many_arguments)]
    fn create_task_and_respond(
        &self,
        kb: &KnowledgeBase,
        parser: &TimeParser,
        queue: &OfflineQueue,
        envelope: &Envelope,
        title: &str,
        parsed: Option<secondbrain_timezone::ParsedInstant>,
        person_ids: Vec<PersonId>,
        place_id: Option<PlaceId>,
        project_id: Option<ProjectId>,
        confidence: u8,
        linked: &secondbrain_entities::link::LinkedRelations,
    ) -> Result<String> {
        let (due_at, due_timezone) = match &parsed {
            Some(p) => (Some(parser.to_iso8601(p.instant)), Some(p.instant.timezone().to_string())),
            None => (None, None),
        };

        let now = Utc::now().to_rfc3339();
        let task = Task {
            id: secondbrain_core::ids::TaskId::new(),
            title: title.to_string(),
            status: TaskStatus::Todo,
            priority: Priority::Medium,
            due_at: due_at.clone(),
            due_timezone: due_timezone.clone(),
            source: Some(envelope.source),
            confidence: Some(confidence),
            created_by: CreatedBy::Ai,
            person_ids,
            place_id: place_id.clone(),
            project_id,
            external_doc_id: None,
            external_doc_url: None,
            notes: None,
            deleted_at: None,
            created_at: now.clone(),
            last_modified_at: now,
        };

        match kb.create_task(&task) {
            Ok(()) => {
                self.corrections.track_action(&envelope.chat_id, &envelope.message_id, ActionKind::TaskCreated, task.id.as_ref(), &task.title);

                let key = IdempotencyKey::transport(envelope.source.transport_prefix(), &envelope.chat_id, &envelope.message_id);
                self.audit.log_create(kb, &key, "task", task.id.as_ref(), &task.title)?;

                let ctx = ResponseContext {
                    title: task.title.clone(),
                    due_at: task.due_at.clone(),
                    due_timezone: task.due_timezone.clone(),
                    people: linked.people.iter().map(|p| p.name.clone()).collect(),
                    place: linked.places.first().map(|p| p.name.clone()),
                    project: linked.project.as_ref().map(|p| p.name.clone()),
                };
                let mut response = response::build_response(&ctx, parser);

                if let (Some(place_id), Some(due_at)) = (&task.place_id, &task.due_at) {
                    if let Ok(due_utc) = chrono::DateTime::parse_from_rfc3339(due_at) {
                        let conflict = schedule_conflict::find_conflict(kb, place_id, due_utc.with_timezone(&Utc))?;
                        response = schedule_conflict::append_notice(&response, conflict.as_ref());
                    }
                }

                Ok(response)
            }
            Err(secondbrain_kb::KbError::Database(db_err)) => {
                tracing::warn!(%db_err, "task creation failed, falling back to offline queue");
                queue.enqueue_task(&task.title, &envelope.chat_id, &envelope.message_id, due_at.as_deref(), due_timezone.as_deref(), confidence, Priority::Medium)?;
                Ok(OFFLINE_RESPONSE.to_string())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// "delete that"/"remove this"/"forget it": soft-deletes the chat's
    /// last tracked action through `SoftDeleteService` rather than
    /// `CorrectionHandler`'s own direct-delete path, so that a later "undo"
    /// can restore it (spec §4.8's delete-then-undo round trip).
    fn handle_delete_request(&self, kb: &KnowledgeBase, chat_id: &str, message_id: &str) -> String {
        let Some(last) = self.corrections.last_action(chat_id) else {
            return "I don't have a recent action to delete. What would you like me to remove?".to_string();
        };

        let entity_type = entity_type_for(last.action_kind);
        let result = self.softdelete.soft_delete(kb, &self.audit, entity_type, &last.entity_id, &last.title, chat_id, message_id);
        self.corrections.untrack(chat_id, &last.entity_id);
        result.message
    }

    fn create_inbox_item_and_respond(&self, kb: &KnowledgeBase, queue: &OfflineQueue, envelope: &Envelope, title: &str, confidence: u8) -> Result<String> {
        let needs_clarification = confidence < INBOX_CLARIFICATION_THRESHOLD;
        let now = Utc::now().to_rfc3339();
        let item = InboxItem {
            id: secondbrain_core::ids::InboxItemId::new(),
            raw_input: title.to_string(),
            source: envelope.source,
            chat_id: Some(envelope.chat_id.clone()),
            message_id: Some(envelope.message_id.clone()),
            confidence,
            needs_clarification,
            ai_interpretation: None,
            processed: false,
            linked_task_id: None,
            deleted_at: None,
            created_at: now.clone(),
            last_modified_at: now,
        };

        match kb.create_inbox_item(&item) {
            Ok(()) => {
                let key = IdempotencyKey::transport(envelope.source.transport_prefix(), &envelope.chat_id, &envelope.message_id);
                self.audit.log_capture(kb, &key, &item.raw_input, confidence, item.id.as_ref())?;
                Ok(format!("Got it. Noted: \"{title}\"."))
            }
            Err(secondbrain_kb::KbError::Database(db_err)) => {
                tracing::warn!(%db_err, "inbox item creation failed, falling back to offline queue");
                queue.enqueue_inbox_item(title, envelope.source, &envelope.chat_id, &envelope.message_id, confidence, needs_clarification)?;
                Ok(OFFLINE_RESPONSE.to_string())
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn entity_type_for(action_kind: ActionKind) -> EntityType {
    match action_kind {
        ActionKind::TaskCreated => EntityType::Task,
        ActionKind::PersonCreated => EntityType::Person,
        ActionKind::PlaceCreated => EntityType::Place,
        ActionKind::ProjectCreated => EntityType::Project,
    }
}

fn average_confidence(linked: &secondbrain_entities::link::LinkedRelations) -> Option<u8> {
    let mut values: Vec<f64> = linked.people.iter().map(|p| p.combined_confidence).collect();
    values.extend(linked.places.iter().map(|p| p.combined_confidence));
    if let Some(project) = &linked.project {
        values.push(project.combined_confidence);
    }
    if values.is_empty() {
        return None;
    }
    let avg = values.iter().sum::<f64>() / values.len() as f64;
    Some((avg * 100.0).round().clamp(0.0, 100.0) as u8)
}

/// Best-effort project-name extraction: a trailing "for <Name>" fragment,
/// mirroring the `with <Name>` strategy `extract::extract_people` already
/// uses, at the same 90 confidence tier.
fn extract_project_mention(text: &str) -> Option<(String, u8)> {
    use std::sync::OnceLock;
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    let re = RE.get_or_init(|| regex::Regex::new(r"\b[Ff]or\s+(?:[Tt]he\s+)?([A-Z][\w]*(?:\s+[A-Z][\w]*)*)\s*$").unwrap());
    re.captures(text.trim()).map(|c| (c[1].to_string(), 90))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secondbrain_entities::places::EnrichmentResult;

    struct NoopGeocoder;
    impl GeocodingProvider for NoopGeocoder {
        fn enrich(&self, _query: &str) -> secondbrain_entities::error::Result<EnrichmentResult> {
            Ok(EnrichmentResult { success: false, address: None, lat: None, lng: None, external_place_id: None, error: None })
        }
    }

    fn envelope(text: &str) -> Envelope {
        Envelope { text: text.to_string(), chat_id: "chat-1".to_string(), message_id: "m1".to_string(), source: Source::TelegramText }
    }

    #[test]
    fn imperative_message_becomes_a_task() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let parser = TimeParser::new("UTC");
        let queue = OfflineQueue::new(std::env::temp_dir().join("sb-test-queue-1.jsonl"));
        let processor = MessageProcessor::new();

        let reply = processor.process(&kb, &parser, &NoopGeocoder, &queue, &envelope("call the dentist")).unwrap();
        assert!(reply.starts_with("Got it. call the dentist"));
        assert_eq!(kb.list_tasks(None, false).unwrap().len(), 1);
    }

    #[test]
    fn plain_note_becomes_an_inbox_item() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let parser = TimeParser::new("UTC");
        let queue = OfflineQueue::new(std::env::temp_dir().join("sb-test-queue-2.jsonl"));
        let processor = MessageProcessor::new();

        let reply = processor.process(&kb, &parser, &NoopGeocoder, &queue, &envelope("thinking about switching apartments")).unwrap();
        assert!(reply.contains("Noted"));
        assert_eq!(kb.list_tasks(None, false).unwrap().len(), 0);
    }

    #[test]
    fn duplicate_message_id_is_deduplicated() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let parser = TimeParser::new("UTC");
        let queue = OfflineQueue::new(std::env::temp_dir().join("sb-test-queue-3.jsonl"));
        let processor = MessageProcessor::new();

        let env = envelope("buy milk");
        processor.process(&kb, &parser, &NoopGeocoder, &queue, &env).unwrap();
        let second = processor.process(&kb, &parser, &NoopGeocoder, &queue, &env).unwrap();
        assert!(second.contains("already handled"));
        assert_eq!(kb.list_tasks(None, false).unwrap().len(), 1);
    }

    #[test]
    fn delete_then_undo_restores_the_task() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let parser = TimeParser::new("UTC");
        let queue = OfflineQueue::new(std::env::temp_dir().join("sb-test-queue-4.jsonl"));
        let processor = MessageProcessor::new();

        let create = Envelope { text: "call the dentist".to_string(), chat_id: "chat-1".to_string(), message_id: "m1".to_string(), source: Source::TelegramText };
        processor.process(&kb, &parser, &NoopGeocoder, &queue, &create).unwrap();
        assert_eq!(kb.list_tasks(None, false).unwrap().len(), 1);

        let delete = Envelope { text: "delete that".to_string(), chat_id: "chat-1".to_string(), message_id: "m2".to_string(), source: Source::TelegramText };
        let deleted = processor.process(&kb, &parser, &NoopGeocoder, &queue, &delete).unwrap();
        assert!(deleted.contains("Removed"));
        assert!(kb.list_tasks(None, false).unwrap().is_empty());

        let undo = Envelope { text: "undo".to_string(), chat_id: "chat-1".to_string(), message_id: "m3".to_string(), source: Source::TelegramText };
        let restored = processor.process(&kb, &parser, &NoopGeocoder, &queue, &undo).unwrap();
        assert!(restored.contains("Restored"));
        assert_eq!(kb.list_tasks(None, false).unwrap().len(), 1);
    }

    #[test]
    fn project_mention_is_extracted_from_trailing_for_clause() {
        let (name, confidence) = extract_project_mention("Draft the proposal for Website Launch").unwrap();
        assert_eq!(name, "Website Launch");
        assert_eq!(confidence, 90);
    }
}
