use chrono::{DateTime, Duration, Utc};

/// Maximum age of an action that can still be corrected (spec §4.7).
pub const MAX_ACTION_AGE_MINUTES: i64 = 30;

/// Recent actions kept per chat, newest last (spec §4.7 `MAX_RECENT_ACTIONS`).
pub const MAX_RECENT_ACTIONS: usize = 10;

/// What kind of entity a tracked action created, so a later correction
/// knows which `KnowledgeBase` update method to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    TaskCreated,
    PersonCreated,
    PlaceCreated,
    ProjectCreated,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ActionKind::TaskCreated => "task_created",
            ActionKind::PersonCreated => "person_created",
            ActionKind::PlaceCreated => "place_created",
            ActionKind::ProjectCreated => "project_created",
        })
    }
}

impl ActionKind {
    pub fn entity_type(&self) -> &'static str {
        match self {
            ActionKind::TaskCreated => "task",
            ActionKind::PersonCreated => "person",
            ActionKind::PlaceCreated => "place",
            ActionKind::ProjectCreated => "project",
        }
    }
}

/// One action the AI recently took, tracked so a follow-up correction has
/// something to apply to (spec §4.7 `RecentAction`).
#[derive(Debug, Clone)]
pub struct RecentAction {
    pub action_kind: ActionKind,
    pub entity_id: String,
    pub title: String,
    pub timestamp: DateTime<Utc>,
    pub chat_id: String,
    pub message_id: String,
}

impl RecentAction {
    pub fn is_expired(&self) -> bool {
        Utc::now() - self.timestamp > Duration::minutes(MAX_ACTION_AGE_MINUTES)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionType {
    Undo,
    Title,
}

/// Outcome of `CorrectionHandler::process_correction` (spec §4.7
/// `CorrectionResult`).
#[derive(Debug, Clone, Default)]
pub struct CorrectionResult {
    pub is_correction: bool,
    pub original_value: Option<String>,
    pub corrected_value: Option<String>,
    pub correction_type: Option<CorrectionType>,
    pub entity_id: Option<String>,
    pub success: bool,
    pub message: String,
}

impl CorrectionResult {
    pub fn not_a_correction() -> Self {
        Self::default()
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            is_correction: true,
            message: message.into(),
            ..Default::default()
        }
    }
}
