use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use tracing::instrument;

use secondbrain_audit::{AuditLogger, IdempotencyKey};
use secondbrain_core::ids::{PersonId, PlaceId, ProjectId, TaskId};
use secondbrain_core::records::PatternType;
use secondbrain_kb::KnowledgeBase;
use secondbrain_patterns::{CorrectionRecord, PatternDetector};

use crate::detect::{extract_correction, is_correction_message, is_undo_request};
use crate::types::{ActionKind, CorrectionResult, CorrectionType, RecentAction, MAX_RECENT_ACTIONS};

fn pattern_type_for(action_kind: ActionKind) -> PatternType {
    match action_kind {
        ActionKind::TaskCreated => PatternType::Name,
        ActionKind::PersonCreated => PatternType::Person,
        ActionKind::PlaceCreated => PatternType::Place,
        ActionKind::ProjectCreated => PatternType::Name,
    }
}

/// Correction handler (C7). Tracks recently created entities per chat and,
/// when a follow-up message corrects one, updates the record and feeds the
/// correction into pattern memory. Grounded on
/// `examples/original_source/src/assistant/services/corrections.py`'s
/// `CorrectionHandler`.
#[derive(Default)]
pub struct CorrectionHandler {
    recent_actions: Mutex<HashMap<String, Vec<RecentAction>>>,
}

impl CorrectionHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a just-created entity so a later correction has context
    /// (spec §4.7 `track_action`).
    pub fn track_action(&self, chat_id: &str, message_id: &str, action_kind: ActionKind, entity_id: &str, title: &str) {
        let mut actions = self.recent_actions.lock().unwrap();
        let list = actions.entry(chat_id.to_string()).or_default();
        list.push(RecentAction {
            action_kind,
            entity_id: entity_id.to_string(),
            title: title.to_string(),
            timestamp: Utc::now(),
            chat_id: chat_id.to_string(),
            message_id: message_id.to_string(),
        });
        list.retain(|a| !a.is_expired());
        if list.len() > MAX_RECENT_ACTIONS {
            let excess = list.len() - MAX_RECENT_ACTIONS;
            list.drain(..excess);
        }
    }

    /// Most recent non-expired action for `chat_id` (spec §4.7
    /// `get_last_action`).
    pub fn last_action(&self, chat_id: &str) -> Option<RecentAction> {
        self.recent_actions
            .lock()
            .unwrap()
            .get(chat_id)
            .and_then(|v| v.iter().rev().find(|a| !a.is_expired()).cloned())
    }

    /// Detects and applies a correction to the chat's last tracked action
    /// (spec §4.7 `process_correction`). `patterns` is mutable because
    /// pattern detection accumulates correction history.
    #[instrument(skip(self, kb, audit, patterns, text))]
    pub fn process_correction(
        &self,
        kb: &KnowledgeBase,
        audit: &AuditLogger,
        patterns: &mut PatternDetector,
        text: &str,
        chat_id: &str,
        message_id: &str,
    ) -> CorrectionResult {
        if !is_correction_message(text) {
            return CorrectionResult::not_a_correction();
        }

        let Some(last) = self.last_action(chat_id) else {
            return CorrectionResult::failure("I don't have a recent action to correct. What would you like me to fix?");
        };

        if is_undo_request(text) {
            return self.handle_undo(kb, audit, &last, chat_id, message_id);
        }

        let (correct_value, wrong_value) = extract_correction(text);
        let Some(correct_value) = correct_value else {
            return CorrectionResult::failure(format!(
                "I created \"{}\" - what should it be instead? (Say something like 'I said X not {}')",
                last.title, last.title
            ));
        };

        self.apply_correction(kb, audit, patterns, &last, &correct_value, wrong_value.as_deref(), chat_id, message_id)
    }

    fn handle_undo(&self, kb: &KnowledgeBase, audit: &AuditLogger, action: &RecentAction, chat_id: &str, message_id: &str) -> CorrectionResult {
        let deleted = match action.action_kind {
            ActionKind::TaskCreated => kb.soft_delete_task(&TaskId::from(action.entity_id.as_str())),
            ActionKind::PersonCreated => kb.soft_delete_person(&PersonId::from(action.entity_id.as_str())),
            ActionKind::PlaceCreated => kb.soft_delete_place(&PlaceId::from(action.entity_id.as_str())),
            ActionKind::ProjectCreated => kb.soft_delete_project(&ProjectId::from(action.entity_id.as_str())),
        };

        if let Err(err) = deleted {
            tracing::warn!(%err, "failed to undo action");
            return CorrectionResult::failure("Sorry, I couldn't undo that. Please try again.");
        }

        let key = IdempotencyKey::undo(chat_id, message_id);
        if let Err(err) = audit.log_delete(kb, &key, &action.entity_id, &action.title) {
            tracing::warn!(%err, "failed to log undo");
        }

        self.untrack(chat_id, &action.entity_id);

        CorrectionResult {
            is_correction: true,
            original_value: Some(action.title.clone()),
            corrected_value: None,
            correction_type: Some(CorrectionType::Undo),
            entity_id: Some(action.entity_id.clone()),
            success: true,
            message: format!("Done. Removed \"{}\".", action.title),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_correction(
        &self,
        kb: &KnowledgeBase,
        audit: &AuditLogger,
        patterns: &mut PatternDetector,
        action: &RecentAction,
        correct_value: &str,
        wrong_value: Option<&str>,
        chat_id: &str,
        message_id: &str,
    ) -> CorrectionResult {
        let original_value = action.title.clone();

        if let Err(err) = self.update_title(kb, action, correct_value) {
            tracing::warn!(%err, "failed to apply correction");
            return CorrectionResult::failure("Sorry, I couldn't make that correction. Please try again.");
        }

        let key = IdempotencyKey::correction(chat_id, message_id);
        let correction_note = match wrong_value {
            Some(wrong) => format!("{wrong} -> {correct_value}"),
            None => format!("(unknown) -> {correct_value}"),
        };
        let action_taken = format!("Updated {}: {original_value} -> {correct_value}", action.action_kind.entity_type());
        let params = secondbrain_audit::LogActionParams::new(secondbrain_core::types::ActionType::Update, key, action_taken)
            .with_entities(vec![action.entity_id.clone()])
            .with_correction(correction_note);
        if let Err(err) = audit.log_action(kb, params) {
            tracing::warn!(%err, "failed to log correction");
        }

        self.retitle(chat_id, &action.entity_id, correct_value);

        let record = CorrectionRecord::new(&original_value, correct_value).with_entity_type(pattern_type_for(action.action_kind));
        let detected = patterns.add_correction(record);

        if let Some(pattern) = detected.first() {
            return CorrectionResult {
                is_correction: true,
                original_value: Some(original_value.clone()),
                corrected_value: Some(correct_value.to_string()),
                correction_type: Some(CorrectionType::Title),
                entity_id: Some(action.entity_id.clone()),
                success: true,
                message: format!(
                    "Fixed. Changed \"{original_value}\" to \"{correct_value}\".\n\nI've noticed you correct '{}' to '{}' frequently ({} times). I'll remember this!",
                    pattern.trigger, pattern.meaning, pattern.occurrences
                ),
            };
        }

        CorrectionResult {
            is_correction: true,
            original_value: Some(original_value.clone()),
            corrected_value: Some(correct_value.to_string()),
            correction_type: Some(CorrectionType::Title),
            entity_id: Some(action.entity_id.clone()),
            success: true,
            message: format!("Fixed. Changed \"{original_value}\" to \"{correct_value}\"."),
        }
    }

    fn update_title(&self, kb: &KnowledgeBase, action: &RecentAction, new_title: &str) -> secondbrain_kb::Result<()> {
        let now = Utc::now().to_rfc3339();
        match action.action_kind {
            ActionKind::TaskCreated => {
                let id = TaskId::from(action.entity_id.as_str());
                let mut task = kb.get_task(&id)?.ok_or_else(|| secondbrain_kb::KbError::NotFound { entity: "task", id: id.0 })?;
                task.title = new_title.to_string();
                task.last_modified_at = now;
                kb.update_task(&task)
            }
            ActionKind::PersonCreated => {
                let id = PersonId::from(action.entity_id.as_str());
                let mut person = kb.get_person(&id)?.ok_or_else(|| secondbrain_kb::KbError::NotFound { entity: "person", id: id.0 })?;
                person.name = new_title.to_string();
                person.last_modified_at = now;
                kb.update_person(&person)
            }
            ActionKind::PlaceCreated => {
                let id = PlaceId::from(action.entity_id.as_str());
                let mut place = kb.get_place(&id)?.ok_or_else(|| secondbrain_kb::KbError::NotFound { entity: "place", id: id.0 })?;
                place.name = new_title.to_string();
                place.last_modified_at = now;
                kb.update_place(&place)
            }
            ActionKind::ProjectCreated => {
                let id = ProjectId::from(action.entity_id.as_str());
                let mut project = kb.get_project(&id)?.ok_or_else(|| secondbrain_kb::KbError::NotFound { entity: "project", id: id.0 })?;
                project.name = new_title.to_string();
                project.last_modified_at = now;
                kb.update_project(&project)
            }
        }
    }

    fn retitle(&self, chat_id: &str, entity_id: &str, new_title: &str) {
        let mut actions = self.recent_actions.lock().unwrap();
        if let Some(list) = actions.get_mut(chat_id) {
            for action in list.iter_mut().filter(|a| a.entity_id == entity_id) {
                action.title = new_title.to_string();
            }
        }
    }

    /// Drops a tracked action without correcting it — used when another
    /// service (soft-delete) takes over responsibility for an entity this
    /// handler was tracking.
    pub fn untrack(&self, chat_id: &str, entity_id: &str) {
        let mut actions = self.recent_actions.lock().unwrap();
        if let Some(list) = actions.get_mut(chat_id) {
            list.retain(|a| a.entity_id != entity_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secondbrain_core::records::Task;
    use secondbrain_core::types::{CreatedBy, Priority, TaskStatus};

    fn sample_task(title: &str) -> Task {
        let now = Utc::now().to_rfc3339();
        Task {
            id: TaskId::new(),
            title: title.to_string(),
            status: TaskStatus::Todo,
            priority: Priority::Medium,
            due_at: None,
            due_timezone: None,
            source: None,
            confidence: None,
            created_by: CreatedBy::Ai,
            person_ids: vec![],
            place_id: None,
            project_id: None,
            external_doc_id: None,
            external_doc_url: None,
            notes: None,
            deleted_at: None,
            created_at: now.clone(),
            last_modified_at: now,
        }
    }

    #[test]
    fn corrects_title_of_last_tracked_task() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let audit = AuditLogger::new();
        let mut patterns = PatternDetector::new();
        let handler = CorrectionHandler::new();

        let task = sample_task("Call Jess");
        kb.create_task(&task).unwrap();
        handler.track_action("C1", "M1", ActionKind::TaskCreated, &task.id.0, &task.title);

        let result = handler.process_correction(&kb, &audit, &mut patterns, "I said Tess not Jess", "C1", "M2");
        assert!(result.success);
        assert_eq!(result.corrected_value.as_deref(), Some("Tess"));

        let updated = kb.get_task(&task.id).unwrap().unwrap();
        assert_eq!(updated.title, "Tess");
    }

    #[test]
    fn undo_request_deletes_and_untracks() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let audit = AuditLogger::new();
        let mut patterns = PatternDetector::new();
        let handler = CorrectionHandler::new();

        let task = sample_task("Call Jess");
        kb.create_task(&task).unwrap();
        handler.track_action("C1", "M1", ActionKind::TaskCreated, &task.id.0, &task.title);

        let result = handler.process_correction(&kb, &audit, &mut patterns, "undo", "C1", "M2");
        assert!(result.success);
        assert!(kb.list_tasks(None, false).unwrap().is_empty());
        assert!(handler.last_action("C1").is_none());
    }

    #[test]
    fn non_correction_text_is_ignored() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let audit = AuditLogger::new();
        let mut patterns = PatternDetector::new();
        let handler = CorrectionHandler::new();

        let result = handler.process_correction(&kb, &audit, &mut patterns, "buy groceries", "C1", "M1");
        assert!(!result.is_correction);
    }

    #[test]
    fn correction_with_no_tracked_action_asks_what_to_fix() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let audit = AuditLogger::new();
        let mut patterns = PatternDetector::new();
        let handler = CorrectionHandler::new();

        let result = handler.process_correction(&kb, &audit, &mut patterns, "actually never mind", "C1", "M1");
        assert!(result.is_correction);
        assert!(!result.success);
    }
}
