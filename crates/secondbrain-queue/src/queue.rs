use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::json;
use tracing::instrument;

use secondbrain_core::ids::{InboxItemId, TaskId};
use secondbrain_core::records::{InboxItem, Task};
use secondbrain_core::types::{CreatedBy, Priority, Source, TaskStatus};
use secondbrain_kb::KnowledgeBase;

use crate::action::{QueuedAction, QueuedActionType};
use crate::MAX_RETRIES;

/// Result of draining the queue against the knowledge base (spec §4.10
/// `QueueProcessResult`).
#[derive(Debug, Clone, Default)]
pub struct QueueProcessResult {
    pub total_processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub deduplicated: usize,
    pub errors: Vec<String>,
}

impl QueueProcessResult {
    pub fn all_successful(&self) -> bool {
        self.failed == 0 && self.total_processed > 0
    }
}

/// Durable fallback for knowledge-base writes when the gateway is down:
/// actions land in an append-only JSONL file and are replayed, in file
/// order, once it recovers (spec §4.10). Grounded on
/// `examples/original_source/src/assistant/services/offline_queue.py`'s
/// `OfflineQueue`.
pub struct OfflineQueue {
    queue_path: PathBuf,
    processed_keys: Mutex<HashSet<String>>,
}

impl OfflineQueue {
    pub fn new(queue_path: impl Into<PathBuf>) -> Self {
        Self {
            queue_path: queue_path.into(),
            processed_keys: Mutex::new(HashSet::new()),
        }
    }

    /// `{data_dir}/queue/pending.jsonl` (spec §4.10 `DEFAULT_QUEUE_PATH`).
    pub fn in_data_dir(data_dir: &str) -> Self {
        Self::new(Path::new(data_dir).join("queue").join("pending.jsonl"))
    }

    fn ensure_queue_dir(&self) -> std::io::Result<()> {
        if let Some(parent) = self.queue_path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    #[instrument(skip(self, action), fields(key = %action.idempotency_key))]
    pub fn enqueue(&self, action: &QueuedAction) -> std::io::Result<()> {
        self.ensure_queue_dir()?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.queue_path)?;
        writeln!(file, "{}", serde_json::to_string(action)?)?;
        tracing::info!(action_type = ?action.action_type, "queued action for offline sync");
        Ok(())
    }

    /// Queues an inbox item capture (spec §4.10 `queue_inbox_item`).
    pub fn enqueue_inbox_item(&self, raw_input: &str, source: Source, chat_id: &str, message_id: &str, confidence: u8, needs_clarification: bool) -> std::io::Result<String> {
        let key = format!("{}:{}:{}", source.transport_prefix(), chat_id, message_id);
        let data = json!({
            "raw_input": raw_input,
            "source": source,
            "confidence": confidence,
            "needs_clarification": needs_clarification,
        });
        let action = QueuedAction::new(QueuedActionType::CreateInbox, key.clone(), data).with_chat(chat_id, message_id);
        self.enqueue(&action)?;
        Ok(key)
    }

    /// Queues a task creation (spec §4.10 `queue_task`).
    pub fn enqueue_task(&self, title: &str, chat_id: &str, message_id: &str, due_at: Option<&str>, due_timezone: Option<&str>, confidence: u8, priority: Priority) -> std::io::Result<String> {
        let key = format!("telegram:{chat_id}:{message_id}");
        let data = json!({
            "title": title,
            "confidence": confidence,
            "priority": priority,
            "due_at": due_at,
            "due_timezone": due_timezone,
        });
        let action = QueuedAction::new(QueuedActionType::CreateTask, key.clone(), data).with_chat(chat_id, message_id);
        self.enqueue(&action)?;
        Ok(key)
    }

    pub fn pending_count(&self) -> usize {
        let Ok(file) = File::open(&self.queue_path) else {
            return 0;
        };
        BufReader::new(file).lines().count()
    }

    /// Reads every well-formed entry in file order; malformed lines are
    /// skipped rather than aborting the whole read (spec §4.10
    /// `read_queue`).
    pub fn read_queue(&self) -> Vec<QueuedAction> {
        let Ok(file) = File::open(&self.queue_path) else {
            return Vec::new();
        };

        BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(&line) {
                Ok(action) => Some(action),
                Err(err) => {
                    tracing::warn!(%err, "skipping malformed queue entry");
                    None
                }
            })
            .collect()
    }

    pub fn clear_queue(&self) -> std::io::Result<()> {
        if self.queue_path.exists() {
            fs::remove_file(&self.queue_path)?;
        }
        self.processed_keys.lock().unwrap().clear();
        Ok(())
    }

    /// Overwrites the queue with exactly `actions` — used to persist the
    /// retry set after a partial drain (spec §4.10 `write_queue`).
    pub fn write_queue(&self, actions: &[QueuedAction]) -> std::io::Result<()> {
        if actions.is_empty() {
            return self.clear_queue();
        }

        self.ensure_queue_dir()?;
        let mut file = File::create(&self.queue_path)?;
        for action in actions {
            writeln!(file, "{}", serde_json::to_string(action)?)?;
        }
        Ok(())
    }

    /// Replays every queued action against `kb`, in file order, deduping
    /// by idempotency key against what's already been processed this
    /// session. Failed actions are requeued up to `MAX_RETRIES` times;
    /// beyond that they're dropped and counted as permanently failed
    /// (spec §4.10 `process_queue`).
    #[instrument(skip(self, kb))]
    pub fn process_queue(&self, kb: &KnowledgeBase) -> QueueProcessResult {
        let actions = self.read_queue();
        if actions.is_empty() {
            return QueueProcessResult::default();
        }

        let mut result = QueueProcessResult {
            total_processed: actions.len(),
            ..Default::default()
        };
        let mut retry_set = Vec::new();

        {
            let mut processed = self.processed_keys.lock().unwrap();
            for mut action in actions {
                if processed.contains(&action.idempotency_key) {
                    result.deduplicated += 1;
                    tracing::info!(key = %action.idempotency_key, "deduplicated queued action");
                    continue;
                }

                match self.apply(kb, &action) {
                    Ok(()) => {
                        processed.insert(action.idempotency_key.clone());
                        result.successful += 1;
                    }
                    Err(err) => {
                        action.retry_count += 1;
                        result.failed += 1;
                        result.errors.push(format!("{}: {err}", action.idempotency_key));
                        tracing::warn!(key = %action.idempotency_key, %err, "failed to sync queued action");
                        if action.retry_count < MAX_RETRIES {
                            retry_set.push(action);
                        }
                    }
                }
            }
        }

        if let Err(err) = self.write_queue(&retry_set) {
            tracing::warn!(%err, "failed to persist retry set");
        }

        result
    }

    fn apply(&self, kb: &KnowledgeBase, action: &QueuedAction) -> Result<(), String> {
        match action.action_type {
            QueuedActionType::CreateInbox => self.apply_create_inbox(kb, action),
            QueuedActionType::CreateTask => self.apply_create_task(kb, action),
            other => Err(format!("action type {other:?} not implemented")),
        }
    }

    fn apply_create_inbox(&self, kb: &KnowledgeBase, action: &QueuedAction) -> Result<(), String> {
        let raw_input = action.data["raw_input"].as_str().ok_or("missing raw_input")?.to_string();
        let source: Source = serde_json::from_value(action.data["source"].clone()).map_err(|e| e.to_string())?;
        let confidence = action.data["confidence"].as_u64().unwrap_or(50) as u8;
        let needs_clarification = action.data["needs_clarification"].as_bool().unwrap_or(true);
        let now = action.timestamp.to_rfc3339();

        let item = InboxItem {
            id: InboxItemId::new(),
            raw_input,
            source,
            chat_id: action.chat_id.clone(),
            message_id: action.message_id.clone(),
            confidence,
            needs_clarification,
            ai_interpretation: None,
            processed: false,
            linked_task_id: None,
            deleted_at: None,
            created_at: now.clone(),
            last_modified_at: now,
        };

        kb.create_inbox_item(&item).map_err(|e| e.to_string())
    }

    fn apply_create_task(&self, kb: &KnowledgeBase, action: &QueuedAction) -> Result<(), String> {
        let title = action.data["title"].as_str().ok_or("missing title")?.to_string();
        let confidence = action.data["confidence"].as_u64().map(|v| v as u8);
        let priority: Priority = action
            .data
            .get("priority")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or(Priority::Medium);
        let due_at = action.data["due_at"].as_str().map(|s| s.to_string());
        let due_timezone = action.data["due_timezone"].as_str().map(|s| s.to_string());
        let now = action.timestamp.to_rfc3339();

        let task = Task {
            id: TaskId::new(),
            title,
            status: TaskStatus::Todo,
            priority,
            due_at,
            due_timezone,
            source: Some(Source::TelegramText),
            confidence,
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

        kb.create_task(&task).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_queue() -> (TempDir, OfflineQueue) {
        let dir = TempDir::new().unwrap();
        let queue = OfflineQueue::new(dir.path().join("pending.jsonl"));
        (dir, queue)
    }

    #[test]
    fn enqueue_then_read_round_trips_in_order() {
        let (_dir, queue) = temp_queue();
        queue.enqueue_task("Buy milk", "C1", "M1", None, None, 80, Priority::Medium).unwrap();
        queue.enqueue_task("Call dentist", "C1", "M2", None, None, 80, Priority::High).unwrap();

        let actions = queue.read_queue();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].data["title"], "Buy milk");
        assert_eq!(actions[1].data["title"], "Call dentist");
    }

    #[test]
    fn process_queue_creates_tasks_and_clears_on_full_success() {
        let (_dir, queue) = temp_queue();
        let kb = KnowledgeBase::open_in_memory().unwrap();
        queue.enqueue_task("Buy milk", "C1", "M1", None, None, 80, Priority::Medium).unwrap();

        let result = queue.process_queue(&kb);
        assert!(result.all_successful());
        assert_eq!(kb.list_tasks(None, false).unwrap().len(), 1);
        assert_eq!(queue.pending_count(), 0);
    }

    #[test]
    fn duplicate_idempotency_key_is_deduplicated_on_replay() {
        let (_dir, queue) = temp_queue();
        let kb = KnowledgeBase::open_in_memory().unwrap();
        queue.enqueue_task("Buy milk", "C1", "M1", None, None, 80, Priority::Medium).unwrap();
        queue.process_queue(&kb);

        queue.enqueue_task("Buy milk", "C1", "M1", None, None, 80, Priority::Medium).unwrap();
        let second = queue.process_queue(&kb);
        assert_eq!(second.deduplicated, 1);
    }

    #[test]
    fn malformed_entries_are_skipped_without_failing_the_read() {
        let (_dir, queue) = temp_queue();
        queue.enqueue_task("Buy milk", "C1", "M1", None, None, 80, Priority::Medium).unwrap();
        {
            let mut file = OpenOptions::new().append(true).open(&queue.queue_path).unwrap();
            writeln!(file, "not json").unwrap();
        }

        let actions = queue.read_queue();
        assert_eq!(actions.len(), 1);
    }
}
