use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Action kinds that can be queued for later replay (spec §4.10
/// `QueuedActionType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueuedActionType {
    CreateInbox,
    CreateTask,
    CreatePerson,
    CreatePlace,
    CreateProject,
    CreateLogEntry,
    UpdateTask,
    UpdatePerson,
    SoftDelete,
}

/// One action waiting to be replayed against the knowledge base, persisted
/// as a single JSONL line (spec §4.10 `QueuedAction`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedAction {
    pub action_type: QueuedActionType,
    pub timestamp: DateTime<Utc>,
    pub idempotency_key: String,
    pub data: Value,
    pub chat_id: Option<String>,
    pub message_id: Option<String>,
    #[serde(default)]
    pub retry_count: u32,
}

impl QueuedAction {
    pub fn new(action_type: QueuedActionType, idempotency_key: impl Into<String>, data: Value) -> Self {
        Self {
            action_type,
            timestamp: Utc::now(),
            idempotency_key: idempotency_key.into(),
            data,
            chat_id: None,
            message_id: None,
            retry_count: 0,
        }
    }

    pub fn with_chat(mut self, chat_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        self.chat_id = Some(chat_id.into());
        self.message_id = Some(message_id.into());
        self
    }
}
