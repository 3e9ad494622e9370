use chrono::{Duration, Utc};
use dashmap::DashMap;
use tracing::instrument;

use secondbrain_core::records::LogEntry;
use secondbrain_core::types::ActionType;
use secondbrain_kb::KnowledgeBase;

use crate::key::IdempotencyKey;

/// The 5-minute grace period a logged action gets an `undo_available_until`
/// stamp for (spec §4.9).
const UNDO_WINDOW_MINUTES: i64 = 5;

/// Result of `AuditLogger::check_idempotency` (spec §4.9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdempotencyCheck {
    New,
    Duplicate { original_log_id: String },
}

/// Parameters for `AuditLogger::log_action`. Every field beyond
/// `action_type`/`idempotency_key`/`action_taken` is optional, mirroring
/// the keyword-argument shape of the Python original's `log_action`.
#[derive(Debug, Clone, Default)]
pub struct LogActionParams {
    pub action_type: Option<ActionType>,
    pub idempotency_key: String,
    pub input_text: Option<String>,
    pub interpretation: Option<String>,
    pub action_taken: String,
    pub confidence: Option<u8>,
    pub entities_affected: Vec<String>,
    pub external_api: Option<String>,
    pub external_resource_id: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub include_undo_window: bool,
    pub correction: Option<String>,
}

impl LogActionParams {
    pub fn new(action_type: ActionType, idempotency_key: impl Into<String>, action_taken: impl Into<String>) -> Self {
        Self {
            action_type: Some(action_type),
            idempotency_key: idempotency_key.into(),
            action_taken: action_taken.into(),
            ..Default::default()
        }
    }

    pub fn with_entities(mut self, entities: Vec<String>) -> Self {
        self.entities_affected = entities;
        self
    }

    pub fn with_input_text(mut self, text: impl Into<String>) -> Self {
        self.input_text = Some(text.into());
        self
    }

    pub fn with_confidence(mut self, confidence: u8) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_correction(mut self, correction: impl Into<String>) -> Self {
        self.correction = Some(correction.into());
        self
    }

    pub fn with_undo_window(mut self) -> Self {
        self.include_undo_window = true;
        self
    }

    pub fn with_external(mut self, api: impl Into<String>, resource_id: impl Into<String>) -> Self {
        self.external_api = Some(api.into());
        self.external_resource_id = Some(resource_id.into());
        self
    }

    pub fn with_error(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self.error_message = Some(message.into());
        self
    }
}

/// The single writer of the idempotency index, and every state-changing
/// action's audit trail (spec §4.9). A read-mostly cache (`DashMap`) sits in
/// front of `KnowledgeBase::find_log_entry_by_idempotency_key` so repeated
/// lookups in one process don't all hit SQLite.
#[derive(Default)]
pub struct AuditLogger {
    cache: DashMap<String, String>,
}

impl AuditLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// `New` means the caller should proceed and log the real action;
    /// `Duplicate` means it already happened.
    #[instrument(skip(self, kb))]
    pub fn check_idempotency(&self, kb: &KnowledgeBase, key: &str) -> secondbrain_kb::Result<IdempotencyCheck> {
        if let Some(entry) = self.cache.get(key) {
            return Ok(IdempotencyCheck::Duplicate { original_log_id: entry.clone() });
        }

        match kb.find_log_entry_by_idempotency_key(key)? {
            Some(entry) => {
                self.cache.insert(key.to_string(), entry.id.clone());
                Ok(IdempotencyCheck::Duplicate { original_log_id: entry.id })
            }
            None => Ok(IdempotencyCheck::New),
        }
    }

    /// Writes `params` as a `LogEntry` and returns it. The caller is
    /// responsible for having called `check_idempotency` first for
    /// state-changing actions.
    #[instrument(skip(self, kb, params), fields(key = %params.idempotency_key))]
    pub fn log_action(&self, kb: &KnowledgeBase, params: LogActionParams) -> secondbrain_kb::Result<LogEntry> {
        let now = Utc::now();
        let entry = LogEntry {
            id: uuid::Uuid::now_v7().to_string(),
            action_type: params.action_type.unwrap_or(ActionType::Create),
            idempotency_key: params.idempotency_key.clone(),
            input_text: params.input_text,
            interpretation: params.interpretation,
            action_taken: params.action_taken,
            confidence: params.confidence,
            entities_affected: params.entities_affected,
            external_api: params.external_api,
            external_resource_id: params.external_resource_id,
            error_code: params.error_code,
            error_message: params.error_message,
            retry_count: None,
            correction: params.correction.clone(),
            corrected_at: params.correction.as_ref().map(|_| now.to_rfc3339()),
            undo_available_until: params
                .include_undo_window
                .then(|| (now + Duration::minutes(UNDO_WINDOW_MINUTES)).to_rfc3339()),
            timestamp: now.to_rfc3339(),
        };

        kb.create_log_entry(&entry)?;
        self.cache.insert(params.idempotency_key, entry.id.clone());
        Ok(entry)
    }

    /// Writes the "already happened" marker entry for a duplicate
    /// idempotency key (spec §4.9 `log_deduplicated`).
    pub fn log_deduplicated(&self, kb: &KnowledgeBase, key: &str, original_log_id: &str) -> secondbrain_kb::Result<LogEntry> {
        let params = LogActionParams::new(
            ActionType::Create,
            IdempotencyKey::dedupe_marker(key),
            format!("deduplicated: action for key '{key}' already recorded"),
        )
        .with_entities(vec![original_log_id.to_string()]);
        self.log_action(kb, params)
    }

    /// Checks idempotency and, if this is a replay, logs the dedupe marker
    /// on the caller's behalf (spec §4.9 "combined check-and-log"). Returns
    /// `true` when the caller should proceed with the real action.
    pub fn ensure_new(&self, kb: &KnowledgeBase, key: &str) -> secondbrain_kb::Result<bool> {
        match self.check_idempotency(kb, key)? {
            IdempotencyCheck::New => Ok(true),
            IdempotencyCheck::Duplicate { original_log_id } => {
                self.log_deduplicated(kb, key, &original_log_id)?;
                Ok(false)
            }
        }
    }

    pub fn log_capture(&self, kb: &KnowledgeBase, key: &str, input_text: &str, confidence: u8, entity_id: &str) -> secondbrain_kb::Result<LogEntry> {
        let params = LogActionParams::new(ActionType::Capture, key, format!("captured inbox item {entity_id}"))
            .with_input_text(input_text)
            .with_confidence(confidence)
            .with_entities(vec![entity_id.to_string()]);
        self.log_action(kb, params)
    }

    /// Chooses CREATE vs CALENDAR_CREATE by `entity_type` (spec §4.9).
    pub fn log_create(&self, kb: &KnowledgeBase, key: &str, entity_type: &str, entity_id: &str, title: &str) -> secondbrain_kb::Result<LogEntry> {
        let action_type = if entity_type == "calendar_event" { ActionType::CalendarCreate } else { ActionType::Create };
        let params = LogActionParams::new(action_type, key, format!("created {entity_type}: {title}"))
            .with_entities(vec![entity_id.to_string()]);
        self.log_action(kb, params)
    }

    pub fn log_update(&self, kb: &KnowledgeBase, key: &str, entity_id: &str, action_taken: &str) -> secondbrain_kb::Result<LogEntry> {
        let params = LogActionParams::new(ActionType::Update, key, action_taken).with_entities(vec![entity_id.to_string()]);
        self.log_action(kb, params)
    }

    pub fn log_delete(&self, kb: &KnowledgeBase, key: &str, entity_id: &str, title: &str) -> secondbrain_kb::Result<LogEntry> {
        let params = LogActionParams::new(ActionType::Delete, key, format!("deleted: {title}"))
            .with_entities(vec![entity_id.to_string()])
            .with_undo_window();
        self.log_action(kb, params)
    }

    pub fn log_calendar_create(&self, kb: &KnowledgeBase, task_id: &str, event_id: &str, yyyy_mm_dd: &str) -> secondbrain_kb::Result<LogEntry> {
        let key = IdempotencyKey::calendar(task_id, yyyy_mm_dd);
        let params = LogActionParams::new(ActionType::CalendarCreate, key, format!("created calendar event for task {task_id}"))
            .with_entities(vec![task_id.to_string()])
            .with_external("calendar", event_id);
        self.log_action(kb, params)
    }

    pub fn log_briefing(&self, kb: &KnowledgeBase, yyyy_mm_dd: &str, chat_id: &str) -> secondbrain_kb::Result<LogEntry> {
        let key = IdempotencyKey::briefing(yyyy_mm_dd, chat_id);
        let params = LogActionParams::new(ActionType::Send, key, format!("sent morning briefing for {yyyy_mm_dd}"));
        self.log_action(kb, params)
    }

    pub fn log_error(&self, kb: &KnowledgeBase, key: &str, code: &str, message: &str) -> secondbrain_kb::Result<LogEntry> {
        let params = LogActionParams::new(ActionType::Error, key, format!("error: {code}")).with_error(code, message);
        self.log_action(kb, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_key_reports_new_then_duplicate() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let logger = AuditLogger::new();
        let key = "telegram:123:456";

        assert_eq!(logger.check_idempotency(&kb, key).unwrap(), IdempotencyCheck::New);
        logger.log_action(&kb, LogActionParams::new(ActionType::Create, key, "created task")).unwrap();

        match logger.check_idempotency(&kb, key).unwrap() {
            IdempotencyCheck::Duplicate { .. } => {}
            IdempotencyCheck::New => panic!("expected duplicate after logging"),
        }
    }

    #[test]
    fn ensure_new_writes_dedupe_marker_on_replay() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let logger = AuditLogger::new();
        let key = "telegram:1:1";

        assert!(logger.ensure_new(&kb, key).unwrap());
        logger.log_action(&kb, LogActionParams::new(ActionType::Create, key, "created task")).unwrap();

        assert!(!logger.ensure_new(&kb, key).unwrap());
        let dedupe_key = IdempotencyKey::dedupe_marker(key);
        assert!(kb.find_log_entry_by_idempotency_key(&dedupe_key).unwrap().is_some());
    }

    #[test]
    fn log_create_chooses_calendar_create_action_type() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let logger = AuditLogger::new();
        let entry = logger.log_create(&kb, "calendar:T1:2024-01-15", "calendar_event", "E1", "Dentist").unwrap();
        assert_eq!(entry.action_type, ActionType::CalendarCreate);
    }

    #[test]
    fn log_delete_sets_undo_window() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let logger = AuditLogger::new();
        let entry = logger.log_delete(&kb, "undo:1:2", "T1", "Buy groceries").unwrap();
        assert!(entry.undo_available_until.is_some());
    }
}
