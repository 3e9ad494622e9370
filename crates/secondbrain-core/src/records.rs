use serde::{Deserialize, Serialize};

use crate::ids::{InboxItemId, PatternId, PersonId, PlaceId, ProjectId, TaskId};
use crate::types::{
    ActionType, CreatedBy, PlaceType, Priority, ProjectStatus, ProjectType, Relationship, Source,
    TaskStatus,
};

/// A task row (spec §3: Task). Timestamps are RFC3339 strings, matching the
/// teacher's convention of storing `chrono::DateTime<Utc>` as SQLite TEXT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
    pub priority: Priority,
    /// RFC3339 instant, e.g. `2024-01-15T14:00:00-08:00`.
    pub due_at: Option<String>,
    /// IANA zone name the due instant was authored in.
    pub due_timezone: Option<String>,
    pub source: Option<Source>,
    pub confidence: Option<u8>,
    pub created_by: CreatedBy,
    pub person_ids: Vec<PersonId>,
    pub place_id: Option<PlaceId>,
    pub project_id: Option<ProjectId>,
    pub external_doc_id: Option<String>,
    pub external_doc_url: Option<String>,
    pub notes: Option<String>,
    pub deleted_at: Option<String>,
    pub created_at: String,
    pub last_modified_at: String,
}

impl Task {
    pub fn is_visible(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    pub aliases: Vec<String>,
    pub relationship: Option<Relationship>,
    pub last_contact: Option<String>,
    pub notes: Option<String>,
    pub deleted_at: Option<String>,
    pub created_at: String,
    pub last_modified_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    pub id: PlaceId,
    pub name: String,
    pub place_type: PlaceType,
    pub address: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub external_place_id: Option<String>,
    pub last_visit: Option<String>,
    pub rating: Option<u8>,
    pub notes: Option<String>,
    pub deleted_at: Option<String>,
    pub created_at: String,
    pub last_modified_at: String,
}

impl Place {
    /// Places are enriched (geocoded) at most once — already-geocoded
    /// records skip re-enrichment (spec §4.4).
    pub fn is_geocoded(&self) -> bool {
        self.lat.is_some() && self.lng.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub project_type: ProjectType,
    pub status: ProjectStatus,
    pub deadline: Option<String>,
    pub next_action: Option<String>,
    pub notes: Option<String>,
    pub deleted_at: Option<String>,
    pub created_at: String,
    pub last_modified_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxItem {
    pub id: InboxItemId,
    pub raw_input: String,
    pub source: Source,
    pub chat_id: Option<String>,
    pub message_id: Option<String>,
    pub confidence: u8,
    pub needs_clarification: bool,
    pub ai_interpretation: Option<String>,
    pub processed: bool,
    pub linked_task_id: Option<TaskId>,
    pub deleted_at: Option<String>,
    pub created_at: String,
    pub last_modified_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub action_type: ActionType,
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
    pub retry_count: Option<u32>,
    pub correction: Option<String>,
    pub corrected_at: Option<String>,
    pub undo_available_until: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Name,
    Person,
    Place,
    Priority,
    Date,
}

impl std::fmt::Display for PatternType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PatternType::Name => "name",
            PatternType::Person => "person",
            PatternType::Place => "place",
            PatternType::Priority => "priority",
            PatternType::Date => "date",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub id: PatternId,
    pub trigger: String,
    pub meaning: String,
    pub confidence: u8,
    pub times_confirmed: u32,
    pub pattern_type: Option<PatternType>,
    pub last_used: String,
}

impl Pattern {
    /// confidence >= 70 (spec §3 invariant).
    pub fn is_auto_applicable(&self) -> bool {
        self.confidence >= 70
    }
}
