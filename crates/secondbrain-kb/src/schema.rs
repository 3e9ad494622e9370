use rusqlite::Connection;

use crate::error::Result;

/// Create every knowledge-base table. Safe to call on every startup
/// (idempotent).
pub fn init_db(conn: &Connection) -> Result<()> {
    create_tasks_table(conn)?;
    create_people_table(conn)?;
    create_places_table(conn)?;
    create_projects_table(conn)?;
    create_inbox_items_table(conn)?;
    create_log_entries_table(conn)?;
    create_patterns_table(conn)?;
    Ok(())
}

fn create_tasks_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS tasks (
            id                  TEXT PRIMARY KEY,
            title               TEXT NOT NULL,
            status              TEXT NOT NULL DEFAULT 'todo',
            priority            TEXT NOT NULL DEFAULT 'medium',
            due_at              TEXT,
            due_timezone        TEXT,
            source              TEXT,
            confidence          INTEGER,
            created_by          TEXT NOT NULL DEFAULT 'human',
            person_ids          TEXT NOT NULL DEFAULT '[]',
            place_id            TEXT,
            project_id          TEXT,
            external_doc_id     TEXT,
            external_doc_url    TEXT,
            notes               TEXT,
            deleted_at          TEXT,
            created_at          TEXT NOT NULL,
            last_modified_at    TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
        CREATE INDEX IF NOT EXISTS idx_tasks_due ON tasks(due_at);
        CREATE INDEX IF NOT EXISTS idx_tasks_deleted ON tasks(deleted_at);",
    )?;
    Ok(())
}

fn create_people_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS people (
            id                  TEXT PRIMARY KEY,
            name                TEXT NOT NULL,
            aliases             TEXT NOT NULL DEFAULT '[]',
            relationship        TEXT,
            last_contact        TEXT,
            notes               TEXT,
            deleted_at          TEXT,
            created_at          TEXT NOT NULL,
            last_modified_at    TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_people_name ON people(name);
        CREATE INDEX IF NOT EXISTS idx_people_deleted ON people(deleted_at);",
    )?;
    Ok(())
}

fn create_places_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS places (
            id                  TEXT PRIMARY KEY,
            name                TEXT NOT NULL,
            place_type          TEXT NOT NULL DEFAULT 'other',
            address             TEXT,
            lat                 REAL,
            lng                 REAL,
            external_place_id   TEXT,
            last_visit          TEXT,
            rating              INTEGER,
            notes               TEXT,
            deleted_at          TEXT,
            created_at          TEXT NOT NULL,
            last_modified_at    TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_places_name ON places(name);
        CREATE INDEX IF NOT EXISTS idx_places_deleted ON places(deleted_at);",
    )?;
    Ok(())
}

fn create_projects_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS projects (
            id                  TEXT PRIMARY KEY,
            name                TEXT NOT NULL,
            project_type        TEXT NOT NULL DEFAULT 'personal',
            status              TEXT NOT NULL DEFAULT 'active',
            deadline            TEXT,
            next_action         TEXT,
            notes               TEXT,
            deleted_at          TEXT,
            created_at          TEXT NOT NULL,
            last_modified_at    TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_projects_name ON projects(name);
        CREATE INDEX IF NOT EXISTS idx_projects_status ON projects(status);",
    )?;
    Ok(())
}

fn create_inbox_items_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS inbox_items (
            id                  TEXT PRIMARY KEY,
            raw_input           TEXT NOT NULL,
            source              TEXT NOT NULL,
            chat_id             TEXT,
            message_id          TEXT,
            confidence          INTEGER NOT NULL DEFAULT 0,
            needs_clarification INTEGER NOT NULL DEFAULT 0,
            ai_interpretation   TEXT,
            processed           INTEGER NOT NULL DEFAULT 0,
            linked_task_id      TEXT,
            deleted_at          TEXT,
            created_at          TEXT NOT NULL,
            last_modified_at    TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_inbox_processed ON inbox_items(processed);
        CREATE INDEX IF NOT EXISTS idx_inbox_chat ON inbox_items(chat_id, message_id);",
    )?;
    Ok(())
}

fn create_log_entries_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS log_entries (
            id                      TEXT PRIMARY KEY,
            action_type             TEXT NOT NULL,
            idempotency_key         TEXT NOT NULL UNIQUE,
            input_text              TEXT,
            interpretation          TEXT,
            action_taken            TEXT NOT NULL,
            confidence              INTEGER,
            entities_affected       TEXT NOT NULL DEFAULT '[]',
            external_api            TEXT,
            external_resource_id    TEXT,
            error_code              TEXT,
            error_message           TEXT,
            retry_count             INTEGER,
            correction              TEXT,
            corrected_at            TEXT,
            undo_available_until    TEXT,
            timestamp               TEXT NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_log_idempotency
            ON log_entries(idempotency_key);
        CREATE INDEX IF NOT EXISTS idx_log_timestamp ON log_entries(timestamp DESC);",
    )?;
    Ok(())
}

fn create_patterns_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS patterns (
            id                  TEXT PRIMARY KEY,
            trigger             TEXT NOT NULL,
            meaning             TEXT NOT NULL,
            confidence          INTEGER NOT NULL DEFAULT 50,
            times_confirmed     INTEGER NOT NULL DEFAULT 1,
            pattern_type        TEXT,
            last_used           TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_patterns_trigger ON patterns(trigger);",
    )?;
    Ok(())
}
