use rusqlite::Row;
use secondbrain_core::records::{InboxItem, LogEntry, Pattern, PatternType, Person, Place, Project, Task};
use secondbrain_core::types::{
    ActionType, CreatedBy, PlaceType, Priority, ProjectStatus, ProjectType, Relationship, Source, TaskStatus,
};

fn parse_string_list(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

pub fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    let status: String = row.get("status")?;
    let priority: String = row.get("priority")?;
    let source: Option<String> = row.get("source")?;
    let created_by: String = row.get("created_by")?;
    let person_ids_raw: String = row.get("person_ids")?;

    Ok(Task {
        id: row.get::<_, String>("id")?.into(),
        title: row.get("title")?,
        status: status.parse().unwrap_or(TaskStatus::Todo),
        priority: priority.parse().unwrap_or(Priority::Medium),
        due_at: row.get("due_at")?,
        due_timezone: row.get("due_timezone")?,
        source: source.and_then(|s| s.parse().ok()),
        confidence: row.get("confidence")?,
        created_by: if created_by == "ai" { CreatedBy::Ai } else { CreatedBy::Human },
        person_ids: parse_string_list(&person_ids_raw).into_iter().map(Into::into).collect(),
        place_id: row.get::<_, Option<String>>("place_id")?.map(Into::into),
        project_id: row.get::<_, Option<String>>("project_id")?.map(Into::into),
        external_doc_id: row.get("external_doc_id")?,
        external_doc_url: row.get("external_doc_url")?,
        notes: row.get("notes")?,
        deleted_at: row.get("deleted_at")?,
        created_at: row.get("created_at")?,
        last_modified_at: row.get("last_modified_at")?,
    })
}

pub fn row_to_person(row: &Row<'_>) -> rusqlite::Result<Person> {
    let relationship: Option<String> = row.get("relationship")?;
    let aliases_raw: String = row.get("aliases")?;

    Ok(Person {
        id: row.get::<_, String>("id")?.into(),
        name: row.get("name")?,
        aliases: parse_string_list(&aliases_raw),
        relationship: relationship.and_then(|r| r.parse::<Relationship>().ok()),
        last_contact: row.get("last_contact")?,
        notes: row.get("notes")?,
        deleted_at: row.get("deleted_at")?,
        created_at: row.get("created_at")?,
        last_modified_at: row.get("last_modified_at")?,
    })
}

pub fn row_to_place(row: &Row<'_>) -> rusqlite::Result<Place> {
    let place_type: String = row.get("place_type")?;

    Ok(Place {
        id: row.get::<_, String>("id")?.into(),
        name: row.get("name")?,
        place_type: place_type.parse().unwrap_or(PlaceType::Other),
        address: row.get("address")?,
        lat: row.get("lat")?,
        lng: row.get("lng")?,
        external_place_id: row.get("external_place_id")?,
        last_visit: row.get("last_visit")?,
        rating: row.get("rating")?,
        notes: row.get("notes")?,
        deleted_at: row.get("deleted_at")?,
        created_at: row.get("created_at")?,
        last_modified_at: row.get("last_modified_at")?,
    })
}

pub fn row_to_project(row: &Row<'_>) -> rusqlite::Result<Project> {
    let project_type: String = row.get("project_type")?;
    let status: String = row.get("status")?;

    Ok(Project {
        id: row.get::<_, String>("id")?.into(),
        name: row.get("name")?,
        project_type: project_type.parse().unwrap_or(ProjectType::Personal),
        status: status.parse().unwrap_or(ProjectStatus::Active),
        deadline: row.get("deadline")?,
        next_action: row.get("next_action")?,
        notes: row.get("notes")?,
        deleted_at: row.get("deleted_at")?,
        created_at: row.get("created_at")?,
        last_modified_at: row.get("last_modified_at")?,
    })
}

pub fn row_to_inbox_item(row: &Row<'_>) -> rusqlite::Result<InboxItem> {
    let source: String = row.get("source")?;

    Ok(InboxItem {
        id: row.get::<_, String>("id")?.into(),
        raw_input: row.get("raw_input")?,
        source: source.parse().unwrap_or(Source::TelegramText),
        chat_id: row.get("chat_id")?,
        message_id: row.get("message_id")?,
        confidence: row.get("confidence")?,
        needs_clarification: row.get("needs_clarification")?,
        ai_interpretation: row.get("ai_interpretation")?,
        processed: row.get("processed")?,
        linked_task_id: row.get::<_, Option<String>>("linked_task_id")?.map(Into::into),
        deleted_at: row.get("deleted_at")?,
        created_at: row.get("created_at")?,
        last_modified_at: row.get("last_modified_at")?,
    })
}

pub fn row_to_log_entry(row: &Row<'_>) -> rusqlite::Result<LogEntry> {
    let action_type: String = row.get("action_type")?;
    let entities_raw: String = row.get("entities_affected")?;

    Ok(LogEntry {
        id: row.get("id")?,
        action_type: parse_action_type(&action_type),
        idempotency_key: row.get("idempotency_key")?,
        input_text: row.get("input_text")?,
        interpretation: row.get("interpretation")?,
        action_taken: row.get("action_taken")?,
        confidence: row.get("confidence")?,
        entities_affected: parse_string_list(&entities_raw),
        external_api: row.get("external_api")?,
        external_resource_id: row.get("external_resource_id")?,
        error_code: row.get("error_code")?,
        error_message: row.get("error_message")?,
        retry_count: row.get("retry_count")?,
        correction: row.get("correction")?,
        corrected_at: row.get("corrected_at")?,
        undo_available_until: row.get("undo_available_until")?,
        timestamp: row.get("timestamp")?,
    })
}

fn parse_action_type(s: &str) -> ActionType {
    match s {
        "capture" => ActionType::Capture,
        "create" => ActionType::Create,
        "update" => ActionType::Update,
        "delete" => ActionType::Delete,
        "send" => ActionType::Send,
        "research" => ActionType::Research,
        "calendar-create" => ActionType::CalendarCreate,
        _ => ActionType::Error,
    }
}

pub fn row_to_pattern(row: &Row<'_>) -> rusqlite::Result<Pattern> {
    let pattern_type: Option<String> = row.get("pattern_type")?;

    Ok(Pattern {
        id: row.get::<_, String>("id")?.into(),
        trigger: row.get("trigger")?,
        meaning: row.get("meaning")?,
        confidence: row.get("confidence")?,
        times_confirmed: row.get("times_confirmed")?,
        pattern_type: pattern_type.and_then(|t| parse_pattern_type(&t)),
        last_used: row.get("last_used")?,
    })
}

fn parse_pattern_type(s: &str) -> Option<PatternType> {
    Some(match s {
        "name" => PatternType::Name,
        "person" => PatternType::Person,
        "place" => PatternType::Place,
        "priority" => PatternType::Priority,
        "date" => PatternType::Date,
        _ => return None,
    })
}
