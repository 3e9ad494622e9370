//! `/debrief` clarification loop (spec §4.13): a per-chat state machine
//! over the unprocessed inbox backlog. State is kept in memory only — a
//! stalled clarification is cheap to lose on restart, and the 30-minute
//! timeout already bounds how long it needs to survive. A per-key
//! get-or-create idiom over a shared lock, applied to an in-memory map
//! instead of a SQLite table.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use tracing::instrument;

use secondbrain_core::ids::TaskId;
use secondbrain_core::records::{InboxItem, Task};
use secondbrain_core::types::{CreatedBy, Priority, TaskStatus};
use secondbrain_kb::KnowledgeBase;

use crate::error::Result;

const TIMEOUT_MINUTES: i64 = 30;
const LISTING_PAGE_SIZE: usize = 5;

#[derive(Debug, Clone)]
enum StateKind {
    Idle,
    AwaitingSelection { items: Vec<InboxItem> },
    AwaitingDecision { item: InboxItem },
}

#[derive(Debug, Clone)]
struct ChatState {
    kind: StateKind,
    updated_at: DateTime<Utc>,
}

impl ChatState {
    fn idle() -> Self {
        Self { kind: StateKind::Idle, updated_at: Utc::now() }
    }

    fn is_expired(&self) -> bool {
        !matches!(self.kind, StateKind::Idle) && Utc::now() - self.updated_at > Duration::minutes(TIMEOUT_MINUTES)
    }
}

/// Drives the per-chat `/debrief` conversation. Holds no reference to the
/// knowledge base — every method that needs it takes `&KnowledgeBase`
/// explicitly, matching the rest of this codebase's no-singleton rule.
#[derive(Default)]
pub struct ClarificationLoop {
    states: Mutex<HashMap<String, ChatState>>,
}

impl ClarificationLoop {
    pub fn new() -> Self {
        Self::default()
    }

    fn get_or_idle(&self, chat_id: &str) -> ChatState {
        let mut states = self.states.lock().unwrap();
        let entry = states.entry(chat_id.to_string()).or_insert_with(ChatState::idle);
        if entry.is_expired() {
            *entry = ChatState::idle();
        }
        entry.clone()
    }

    fn set(&self, chat_id: &str, kind: StateKind) {
        self.states.lock().unwrap().insert(chat_id.to_string(), ChatState { kind, updated_at: Utc::now() });
    }

    /// `true` if `text` should be routed into this loop rather than normal
    /// message processing — either `/debrief` itself, or any reply while a
    /// chat has an unexpired, non-idle clarification pending.
    pub fn should_handle(&self, chat_id: &str, text: &str) -> bool {
        text.trim().eq_ignore_ascii_case("/debrief") || !matches!(self.get_or_idle(chat_id).kind, StateKind::Idle)
    }

    /// Processes one turn of the loop. Returns the reply to send.
    #[instrument(skip(self, kb, text))]
    pub fn handle(&self, kb: &KnowledgeBase, chat_id: &str, text: &str) -> Result<String> {
        let trimmed = text.trim();

        if trimmed.eq_ignore_ascii_case("/debrief") {
            return self.start(kb, chat_id);
        }

        match self.get_or_idle(chat_id).kind {
            StateKind::Idle => self.start(kb, chat_id),
            StateKind::AwaitingSelection { items } => self.handle_selection(chat_id, trimmed, items),
            StateKind::AwaitingDecision { item } => self.handle_decision(kb, chat_id, trimmed, item),
        }
    }

    fn start(&self, kb: &KnowledgeBase, chat_id: &str) -> Result<String> {
        let items: Vec<InboxItem> = kb.list_unprocessed_inbox_items()?.into_iter().take(LISTING_PAGE_SIZE).collect();

        if items.is_empty() {
            self.set(chat_id, StateKind::Idle);
            return Ok("Nothing needs clarification right now.".to_string());
        }

        let mut message = String::from("Which one do you want to handle?\n");
        for (i, item) in items.iter().enumerate() {
            message.push_str(&format!("{}. {}\n", i + 1, item.raw_input));
        }
        message.push_str("\nReply with a number.");

        self.set(chat_id, StateKind::AwaitingSelection { items });
        Ok(message.trim_end().to_string())
    }

    fn handle_selection(&self, chat_id: &str, text: &str, items: Vec<InboxItem>) -> Result<String> {
        let Ok(choice) = text.parse::<usize>() else {
            self.set(chat_id, StateKind::AwaitingSelection { items });
            return Ok("Please reply with just the number of the item.".to_string());
        };

        let Some(item) = choice.checked_sub(1).and_then(|i| items.get(i)).cloned() else {
            self.set(chat_id, StateKind::AwaitingSelection { items });
            return Ok(format!("That's not one of the listed items — reply with a number from 1 to the last one shown."));
        };

        let prompt = format!(
            "\"{}\" — reply \"skip\", \"task: <title>\" to turn it into a task, or \"dismiss\" to drop it.",
            item.raw_input
        );
        self.set(chat_id, StateKind::AwaitingDecision { item });
        Ok(prompt)
    }

    fn handle_decision(&self, kb: &KnowledgeBase, chat_id: &str, text: &str, mut item: InboxItem) -> Result<String> {
        let lower = text.to_lowercase();

        let outcome = if lower == "skip" {
            self.mark_processed(kb, &mut item)?;
            "Skipped.".to_string()
        } else if lower == "dismiss" {
            self.mark_processed(kb, &mut item)?;
            "Dismissed.".to_string()
        } else if let Some(title) = text.strip_prefix("task:").or_else(|| text.strip_prefix("Task:")) {
            let title = title.trim();
            if title.is_empty() {
                self.set(chat_id, StateKind::AwaitingDecision { item });
                return Ok("What should the task be titled?".to_string());
            }
            let task_id = self.create_linked_task(kb, title, &item)?;
            item.linked_task_id = Some(task_id);
            self.mark_processed(kb, &mut item)?;
            format!("Created task: \"{title}\".")
        } else {
            self.set(chat_id, StateKind::AwaitingDecision { item });
            return Ok("Reply \"skip\", \"task: <title>\", or \"dismiss\".".to_string());
        };

        let next = self.start(kb, chat_id)?;
        Ok(format!("{outcome}\n\n{next}"))
    }

    fn mark_processed(&self, kb: &KnowledgeBase, item: &mut InboxItem) -> Result<()> {
        item.processed = true;
        item.last_modified_at = Utc::now().to_rfc3339();
        kb.update_inbox_item(item)?;
        Ok(())
    }

    fn create_linked_task(&self, kb: &KnowledgeBase, title: &str, item: &InboxItem) -> Result<TaskId> {
        let now = Utc::now().to_rfc3339();
        let task = Task {
            id: TaskId::new(),
            title: title.to_string(),
            status: TaskStatus::Todo,
            priority: Priority::Medium,
            due_at: None,
            due_timezone: None,
            source: Some(item.source),
            confidence: Some(item.confidence),
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
        };
        kb.create_task(&task)?;
        Ok(task.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_item(kb: &KnowledgeBase, text: &str) {
        use secondbrain_core::ids::InboxItemId;
        use secondbrain_core::types::Source;

        let now = Utc::now().to_rfc3339();
        kb.create_inbox_item(&InboxItem {
            id: InboxItemId::new(),
            raw_input: text.to_string(),
            source: Source::TelegramText,
            chat_id: Some("C1".to_string()),
            message_id: Some("M1".to_string()),
            confidence: 40,
            needs_clarification: true,
            ai_interpretation: None,
            processed: false,
            linked_task_id: None,
            deleted_at: None,
            created_at: now.clone(),
            last_modified_at: now,
        })
        .unwrap();
    }

    #[test]
    fn debrief_with_empty_backlog_says_so() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let loop_ = ClarificationLoop::new();
        let reply = loop_.handle(&kb, "C1", "/debrief").unwrap();
        assert_eq!(reply, "Nothing needs clarification right now.");
    }

    #[test]
    fn full_round_trip_creates_a_task_from_selection() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        seed_item(&kb, "maybe call the dentist");
        let loop_ = ClarificationLoop::new();

        let listing = loop_.handle(&kb, "C1", "/debrief").unwrap();
        assert!(listing.contains("maybe call the dentist"));

        let prompt = loop_.handle(&kb, "C1", "1").unwrap();
        assert!(prompt.contains("maybe call the dentist"));

        let result = loop_.handle(&kb, "C1", "task: Call the dentist").unwrap();
        assert!(result.starts_with("Created task: \"Call the dentist\"."));

        let items = kb.list_unprocessed_inbox_items().unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn skip_marks_processed_without_creating_a_task() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        seed_item(&kb, "random note");
        let loop_ = ClarificationLoop::new();

        loop_.handle(&kb, "C1", "/debrief").unwrap();
        loop_.handle(&kb, "C1", "1").unwrap();
        loop_.handle(&kb, "C1", "skip").unwrap();

        assert!(kb.list_unprocessed_inbox_items().unwrap().is_empty());
        assert_eq!(kb.list_tasks(None, false).unwrap().len(), 0);
    }
}
