use chrono::{DateTime, Duration, Utc};

/// Undo window for soft-deleted items (spec §3/§8: 30 days).
pub const UNDO_WINDOW_DAYS: i64 = 30;

/// Which knowledge-base table a deleted entity lives in, so the service
/// can dispatch to the right `KnowledgeBase` soft-delete/restore method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityType {
    Task,
    Person,
    Place,
    Project,
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EntityType::Task => "task",
            EntityType::Person => "person",
            EntityType::Place => "place",
            EntityType::Project => "project",
        })
    }
}

/// One soft-deleted item tracked in a chat's undo ring (spec §3
/// `RecentAction`/`DeletedAction`, §4.8).
#[derive(Debug, Clone)]
pub struct DeletedAction {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub title: String,
    pub deleted_at: DateTime<Utc>,
    pub chat_id: String,
    pub message_id: String,
}

impl DeletedAction {
    pub fn is_within_undo_window(&self) -> bool {
        Utc::now() - self.deleted_at < Duration::days(UNDO_WINDOW_DAYS)
    }
}

#[derive(Debug, Clone)]
pub struct DeleteResult {
    pub success: bool,
    pub entity_id: Option<String>,
    pub entity_type: Option<EntityType>,
    pub title: Option<String>,
    pub message: String,
    pub can_undo: bool,
}

#[derive(Debug, Clone)]
pub struct UndoResult {
    pub success: bool,
    pub entity_id: Option<String>,
    pub entity_type: Option<EntityType>,
    pub title: Option<String>,
    pub message: String,
}
