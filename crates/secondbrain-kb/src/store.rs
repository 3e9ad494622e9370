use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::instrument;

use secondbrain_core::ids::{InboxItemId, PatternId, PersonId, PlaceId, ProjectId, TaskId};
use secondbrain_core::records::{InboxItem, LogEntry, Pattern, Person, Place, Project, Task};

use crate::error::{KbError, Result};
use crate::rows::{
    row_to_inbox_item, row_to_log_entry, row_to_pattern, row_to_person, row_to_place, row_to_project, row_to_task,
};
use crate::schema::init_db;

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn to_json_list(items: &[impl AsRef<str>]) -> String {
    serde_json::to_string(&items.iter().map(|s| s.as_ref()).collect::<Vec<_>>()).unwrap_or_else(|_| "[]".to_string())
}

/// Owns the single SQLite connection backing every entity table: Task,
/// Person, Place, Project, InboxItem, LogEntry, Pattern. No singleton:
/// constructed once by `Application` and shared behind an `Arc`.
pub struct KnowledgeBase {
    db: Mutex<Connection>,
}

impl KnowledgeBase {
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self { db: Mutex::new(conn) })
    }

    pub fn open(path: &str) -> Result<Self> {
        Self::new(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    // ---- Tasks ----------------------------------------------------------

    #[instrument(skip(self, task))]
    pub fn create_task(&self, task: &Task) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO tasks (id, title, status, priority, due_at, due_timezone, source,
                confidence, created_by, person_ids, place_id, project_id, external_doc_id,
                external_doc_url, notes, deleted_at, created_at, last_modified_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18)",
            params![
                task.id.0,
                task.title,
                task.status.to_string(),
                task.priority.to_string(),
                task.due_at,
                task.due_timezone,
                task.source.map(|s| s.to_string()),
                task.confidence,
                task.created_by.to_string(),
                to_json_list(&task.person_ids.iter().map(|p| p.0.as_str()).collect::<Vec<_>>()),
                task.place_id.as_ref().map(|p| &p.0),
                task.project_id.as_ref().map(|p| &p.0),
                task.external_doc_id,
                task.external_doc_url,
                task.notes,
                task.deleted_at,
                task.created_at,
                task.last_modified_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_task(&self, id: &TaskId) -> Result<Option<Task>> {
        let db = self.db.lock().unwrap();
        db.query_row("SELECT * FROM tasks WHERE id = ?1", params![id.0], row_to_task)
            .optional()
            .map_err(KbError::from)
    }

    /// All non-deleted tasks, optionally filtered by status string.
    pub fn list_tasks(&self, status: Option<&str>, include_deleted: bool) -> Result<Vec<Task>> {
        let db = self.db.lock().unwrap();
        let sql = match (status, include_deleted) {
            (Some(_), false) => "SELECT * FROM tasks WHERE status = ?1 AND deleted_at IS NULL ORDER BY due_at ASC",
            (Some(_), true) => "SELECT * FROM tasks WHERE status = ?1 ORDER BY due_at ASC",
            (None, false) => "SELECT * FROM tasks WHERE deleted_at IS NULL ORDER BY due_at ASC",
            (None, true) => "SELECT * FROM tasks ORDER BY due_at ASC",
        };
        let mut stmt = db.prepare(sql)?;
        let rows = if let Some(s) = status {
            stmt.query_map(params![s], row_to_task)?.filter_map(|r| r.ok()).collect()
        } else {
            stmt.query_map([], row_to_task)?.filter_map(|r| r.ok()).collect()
        };
        Ok(rows)
    }

    /// Tasks with `due_at` inside `[start, end)` (RFC3339 bounds), for
    /// nudge-window queries (spec §4.12).
    pub fn list_tasks_due_between(&self, start: &str, end: &str) -> Result<Vec<Task>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT * FROM tasks WHERE deleted_at IS NULL AND status IN ('todo', 'in-progress')
             AND due_at >= ?1 AND due_at < ?2 ORDER BY due_at ASC",
        )?;
        let rows = stmt
            .query_map(params![start, end], row_to_task)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    pub fn update_task(&self, task: &Task) -> Result<()> {
        let db = self.db.lock().unwrap();
        let updated = now();
        db.execute(
            "UPDATE tasks SET title=?1, status=?2, priority=?3, due_at=?4, due_timezone=?5,
                source=?6, confidence=?7, person_ids=?8, place_id=?9, project_id=?10,
                external_doc_id=?11, external_doc_url=?12, notes=?13, deleted_at=?14,
                last_modified_at=?15
             WHERE id = ?16",
            params![
                task.title,
                task.status.to_string(),
                task.priority.to_string(),
                task.due_at,
                task.due_timezone,
                task.source.map(|s| s.to_string()),
                task.confidence,
                to_json_list(&task.person_ids.iter().map(|p| p.0.as_str()).collect::<Vec<_>>()),
                task.place_id.as_ref().map(|p| &p.0),
                task.project_id.as_ref().map(|p| &p.0),
                task.external_doc_id,
                task.external_doc_url,
                task.notes,
                task.deleted_at,
                updated,
                task.id.0,
            ],
        )?;
        Ok(())
    }

    pub fn soft_delete_task(&self, id: &TaskId) -> Result<()> {
        let db = self.db.lock().unwrap();
        let ts = now();
        let n = db.execute(
            "UPDATE tasks SET deleted_at = ?1, last_modified_at = ?1 WHERE id = ?2",
            params![ts, id.0],
        )?;
        if n == 0 {
            return Err(KbError::NotFound { entity: "task", id: id.0.clone() });
        }
        Ok(())
    }

    pub fn restore_task(&self, id: &TaskId) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE tasks SET deleted_at = NULL, last_modified_at = ?1 WHERE id = ?2",
            params![now(), id.0],
        )?;
        Ok(())
    }

    // ---- People -----------------------------------------------------------

    pub fn create_person(&self, person: &Person) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO people (id, name, aliases, relationship, last_contact, notes,
                deleted_at, created_at, last_modified_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
            params![
                person.id.0,
                person.name,
                to_json_list(&person.aliases),
                person.relationship.map(|r| r.to_string()),
                person.last_contact,
                person.notes,
                person.deleted_at,
                person.created_at,
                person.last_modified_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_person(&self, id: &PersonId) -> Result<Option<Person>> {
        let db = self.db.lock().unwrap();
        db.query_row("SELECT * FROM people WHERE id = ?1", params![id.0], row_to_person)
            .optional()
            .map_err(KbError::from)
    }

    /// All non-deleted people, for in-process confidence scoring by the
    /// entity-matching layer (spec §4.4).
    pub fn list_people(&self) -> Result<Vec<Person>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare("SELECT * FROM people WHERE deleted_at IS NULL")?;
        let rows = stmt.query_map([], row_to_person)?.filter_map(|r| r.ok()).collect();
        Ok(rows)
    }

    pub fn update_person(&self, person: &Person) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE people SET name=?1, aliases=?2, relationship=?3, last_contact=?4,
                notes=?5, deleted_at=?6, last_modified_at=?7 WHERE id = ?8",
            params![
                person.name,
                to_json_list(&person.aliases),
                person.relationship.map(|r| r.to_string()),
                person.last_contact,
                person.notes,
                person.deleted_at,
                now(),
                person.id.0,
            ],
        )?;
        Ok(())
    }

    pub fn update_last_contact(&self, id: &PersonId, at: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE people SET last_contact = ?1, last_modified_at = ?2 WHERE id = ?3",
            params![at, now(), id.0],
        )?;
        Ok(())
    }

    pub fn soft_delete_person(&self, id: &PersonId) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE people SET deleted_at = ?1, last_modified_at = ?1 WHERE id = ?2",
            params![now(), id.0],
        )?;
        Ok(())
    }

    pub fn restore_person(&self, id: &PersonId) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE people SET deleted_at = NULL, last_modified_at = ?1 WHERE id = ?2",
            params![now(), id.0],
        )?;
        Ok(())
    }

    // ---- Places -------------------------------------------------------------

    pub fn create_place(&self, place: &Place) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO places (id, name, place_type, address, lat, lng, external_place_id,
                last_visit, rating, notes, deleted_at, created_at, last_modified_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)",
            params![
                place.id.0,
                place.name,
                place.place_type.to_string(),
                place.address,
                place.lat,
                place.lng,
                place.external_place_id,
                place.last_visit,
                place.rating,
                place.notes,
                place.deleted_at,
                place.created_at,
                place.last_modified_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_place(&self, id: &PlaceId) -> Result<Option<Place>> {
        let db = self.db.lock().unwrap();
        db.query_row("SELECT * FROM places WHERE id = ?1", params![id.0], row_to_place)
            .optional()
            .map_err(KbError::from)
    }

    pub fn list_places(&self) -> Result<Vec<Place>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare("SELECT * FROM places WHERE deleted_at IS NULL")?;
        let rows = stmt.query_map([], row_to_place)?.filter_map(|r| r.ok()).collect();
        Ok(rows)
    }

    pub fn update_place(&self, place: &Place) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE places SET name=?1, place_type=?2, address=?3, lat=?4, lng=?5,
                external_place_id=?6, last_visit=?7, rating=?8, notes=?9, deleted_at=?10,
                last_modified_at=?11 WHERE id = ?12",
            params![
                place.name,
                place.place_type.to_string(),
                place.address,
                place.lat,
                place.lng,
                place.external_place_id,
                place.last_visit,
                place.rating,
                place.notes,
                place.deleted_at,
                now(),
                place.id.0,
            ],
        )?;
        Ok(())
    }

    pub fn soft_delete_place(&self, id: &PlaceId) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE places SET deleted_at = ?1, last_modified_at = ?1 WHERE id = ?2",
            params![now(), id.0],
        )?;
        Ok(())
    }

    pub fn restore_place(&self, id: &PlaceId) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE places SET deleted_at = NULL, last_modified_at = ?1 WHERE id = ?2",
            params![now(), id.0],
        )?;
        Ok(())
    }

    // ---- Projects -----------------------------------------------------------

    pub fn create_project(&self, project: &Project) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO projects (id, name, project_type, status, deadline, next_action,
                notes, deleted_at, created_at, last_modified_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
            params![
                project.id.0,
                project.name,
                project.project_type.to_string(),
                project.status.to_string(),
                project.deadline,
                project.next_action,
                project.notes,
                project.deleted_at,
                project.created_at,
                project.last_modified_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_project(&self, id: &ProjectId) -> Result<Option<Project>> {
        let db = self.db.lock().unwrap();
        db.query_row("SELECT * FROM projects WHERE id = ?1", params![id.0], row_to_project)
            .optional()
            .map_err(KbError::from)
    }

    pub fn list_projects(&self, status: Option<&str>) -> Result<Vec<Project>> {
        let db = self.db.lock().unwrap();
        if let Some(s) = status {
            let mut stmt = db.prepare("SELECT * FROM projects WHERE deleted_at IS NULL AND status = ?1")?;
            let rows = stmt.query_map(params![s], row_to_project)?.filter_map(|r| r.ok()).collect();
            Ok(rows)
        } else {
            let mut stmt = db.prepare("SELECT * FROM projects WHERE deleted_at IS NULL")?;
            let rows = stmt.query_map([], row_to_project)?.filter_map(|r| r.ok()).collect();
            Ok(rows)
        }
    }

    pub fn update_project(&self, project: &Project) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE projects SET name=?1, project_type=?2, status=?3, deadline=?4,
                next_action=?5, notes=?6, deleted_at=?7, last_modified_at=?8 WHERE id = ?9",
            params![
                project.name,
                project.project_type.to_string(),
                project.status.to_string(),
                project.deadline,
                project.next_action,
                project.notes,
                project.deleted_at,
                now(),
                project.id.0,
            ],
        )?;
        Ok(())
    }

    pub fn soft_delete_project(&self, id: &ProjectId) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE projects SET deleted_at = ?1, last_modified_at = ?1 WHERE id = ?2",
            params![now(), id.0],
        )?;
        Ok(())
    }

    pub fn restore_project(&self, id: &ProjectId) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE projects SET deleted_at = NULL, last_modified_at = ?1 WHERE id = ?2",
            params![now(), id.0],
        )?;
        Ok(())
    }

    // ---- Inbox items --------------------------------------------------------

    pub fn create_inbox_item(&self, item: &InboxItem) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO inbox_items (id, raw_input, source, chat_id, message_id, confidence,
                needs_clarification, ai_interpretation, processed, linked_task_id, deleted_at,
                created_at, last_modified_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)",
            params![
                item.id.0,
                item.raw_input,
                item.source.to_string(),
                item.chat_id,
                item.message_id,
                item.confidence,
                item.needs_clarification,
                item.ai_interpretation,
                item.processed,
                item.linked_task_id.as_ref().map(|t| &t.0),
                item.deleted_at,
                item.created_at,
                item.last_modified_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_inbox_item(&self, id: &InboxItemId) -> Result<Option<InboxItem>> {
        let db = self.db.lock().unwrap();
        db.query_row("SELECT * FROM inbox_items WHERE id = ?1", params![id.0], row_to_inbox_item)
            .optional()
            .map_err(KbError::from)
    }

    pub fn list_unprocessed_inbox_items(&self) -> Result<Vec<InboxItem>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT * FROM inbox_items WHERE processed = 0 AND needs_clarification = 1 AND deleted_at IS NULL ORDER BY created_at ASC",
        )?;
        let rows = stmt.query_map([], row_to_inbox_item)?.filter_map(|r| r.ok()).collect();
        Ok(rows)
    }

    pub fn update_inbox_item(&self, item: &InboxItem) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE inbox_items SET confidence=?1, needs_clarification=?2, ai_interpretation=?3,
                processed=?4, linked_task_id=?5, deleted_at=?6, last_modified_at=?7 WHERE id = ?8",
            params![
                item.confidence,
                item.needs_clarification,
                item.ai_interpretation,
                item.processed,
                item.linked_task_id.as_ref().map(|t| &t.0),
                item.deleted_at,
                now(),
                item.id.0,
            ],
        )?;
        Ok(())
    }

    // ---- Log entries (audit + idempotency) -----------------------------------

    pub fn create_log_entry(&self, entry: &LogEntry) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO log_entries (id, action_type, idempotency_key, input_text,
                interpretation, action_taken, confidence, entities_affected, external_api,
                external_resource_id, error_code, error_message, retry_count, correction,
                corrected_at, undo_available_until, timestamp)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17)",
            params![
                entry.id,
                entry.action_type.to_string(),
                entry.idempotency_key,
                entry.input_text,
                entry.interpretation,
                entry.action_taken,
                entry.confidence,
                to_json_list(&entry.entities_affected),
                entry.external_api,
                entry.external_resource_id,
                entry.error_code,
                entry.error_message,
                entry.retry_count,
                entry.correction,
                entry.corrected_at,
                entry.undo_available_until,
                entry.timestamp,
            ],
        )?;
        Ok(())
    }

    /// `None` means this idempotency key has never been seen — callers
    /// should proceed; `Some` means the action already happened (spec §7).
    pub fn find_log_entry_by_idempotency_key(&self, key: &str) -> Result<Option<LogEntry>> {
        let db = self.db.lock().unwrap();
        db.query_row(
            "SELECT * FROM log_entries WHERE idempotency_key = ?1",
            params![key],
            row_to_log_entry,
        )
        .optional()
        .map_err(KbError::from)
    }

    pub fn list_recent_log_entries(&self, limit: usize) -> Result<Vec<LogEntry>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare("SELECT * FROM log_entries ORDER BY timestamp DESC LIMIT ?1")?;
        let rows = stmt
            .query_map(params![limit as i64], row_to_log_entry)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// Apply a correction to a log entry (spec §4.7: "change X to Y").
    pub fn apply_correction(&self, id: &str, correction: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE log_entries SET correction = ?1, corrected_at = ?2 WHERE id = ?3",
            params![correction, now(), id],
        )?;
        Ok(())
    }

    // ---- Patterns -------------------------------------------------------------

    pub fn create_pattern(&self, pattern: &Pattern) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO patterns (id, trigger, meaning, confidence, times_confirmed,
                pattern_type, last_used)
             VALUES (?1,?2,?3,?4,?5,?6,?7)",
            params![
                pattern.id.0,
                pattern.trigger,
                pattern.meaning,
                pattern.confidence,
                pattern.times_confirmed,
                pattern.pattern_type.map(|t| t.to_string()),
                pattern.last_used,
            ],
        )?;
        Ok(())
    }

    pub fn get_pattern(&self, id: &PatternId) -> Result<Option<Pattern>> {
        let db = self.db.lock().unwrap();
        db.query_row("SELECT * FROM patterns WHERE id = ?1", params![id.0], row_to_pattern)
            .optional()
            .map_err(KbError::from)
    }

    pub fn list_patterns(&self) -> Result<Vec<Pattern>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare("SELECT * FROM patterns")?;
        let rows = stmt.query_map([], row_to_pattern)?.filter_map(|r| r.ok()).collect();
        Ok(rows)
    }

    pub fn update_pattern(&self, pattern: &Pattern) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE patterns SET meaning=?1, confidence=?2, times_confirmed=?3,
                pattern_type=?4, last_used=?5 WHERE id = ?6",
            params![
                pattern.meaning,
                pattern.confidence,
                pattern.times_confirmed,
                pattern.pattern_type.map(|t| t.to_string()),
                pattern.last_used,
                pattern.id.0,
            ],
        )?;
        Ok(())
    }

    pub fn delete_pattern(&self, id: &PatternId) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute("DELETE FROM patterns WHERE id = ?1", params![id.0])?;
        Ok(())
    }
}
