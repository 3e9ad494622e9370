//! Knowledge-base gateway (C3): the single SQLite-backed store for Tasks,
//! People, Places, Projects, InboxItems, LogEntries and Patterns.
//!
//! A row-mapper-over-`Mutex<Connection>` gateway covering the full schema
//! in spec §3.

pub mod error;
mod rows;
mod schema;
mod store;

pub use error::{KbError, Result};
pub use store::KnowledgeBase;

#[cfg(test)]
mod tests {
    use super::*;
    use secondbrain_core::ids::TaskId;
    use secondbrain_core::records::Task;
    use secondbrain_core::types::{CreatedBy, Priority, TaskStatus};

    fn sample_task() -> Task {
        let now = chrono::Utc::now().to_rfc3339();
        Task {
            id: TaskId::new(),
            title: "Call the dentist".to_string(),
            status: TaskStatus::Todo,
            priority: Priority::Medium,
            due_at: Some(now.clone()),
            due_timezone: Some("UTC".to_string()),
            source: None,
            confidence: Some(90),
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
    fn create_and_get_task_round_trips() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let task = sample_task();
        kb.create_task(&task).unwrap();

        let fetched = kb.get_task(&task.id).unwrap().unwrap();
        assert_eq!(fetched.title, "Call the dentist");
        assert_eq!(fetched.status, TaskStatus::Todo);
    }

    #[test]
    fn soft_delete_hides_task_from_default_list() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let task = sample_task();
        kb.create_task(&task).unwrap();
        kb.soft_delete_task(&task.id).unwrap();

        assert!(kb.list_tasks(None, false).unwrap().is_empty());
        assert_eq!(kb.list_tasks(None, true).unwrap().len(), 1);
    }

    #[test]
    fn restore_brings_task_back() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let task = sample_task();
        kb.create_task(&task).unwrap();
        kb.soft_delete_task(&task.id).unwrap();
        kb.restore_task(&task.id).unwrap();

        assert_eq!(kb.list_tasks(None, false).unwrap().len(), 1);
    }

    #[test]
    fn idempotency_key_lookup_is_none_until_logged() {
        use secondbrain_core::records::LogEntry;
        use secondbrain_core::types::ActionType;

        let kb = KnowledgeBase::open_in_memory().unwrap();
        assert!(kb.find_log_entry_by_idempotency_key("telegram:1:42").unwrap().is_none());

        let entry = LogEntry {
            id: uuid::Uuid::now_v7().to_string(),
            action_type: ActionType::Create,
            idempotency_key: "telegram:1:42".to_string(),
            input_text: Some("call mom".to_string()),
            interpretation: None,
            action_taken: "created task".to_string(),
            confidence: Some(90),
            entities_affected: vec![],
            external_api: None,
            external_resource_id: None,
            error_code: None,
            error_message: None,
            retry_count: None,
            correction: None,
            corrected_at: None,
            undo_available_until: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        kb.create_log_entry(&entry).unwrap();

        assert!(kb.find_log_entry_by_idempotency_key("telegram:1:42").unwrap().is_some());
    }
}
