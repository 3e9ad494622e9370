//! Morning briefing generator (spec §4.13): one message per run, covering
//! DUE TODAY, OVERDUE and NEEDS CLARIFICATION, capped off with a `/debrief`
//! call to action when there's anything to clarify.

use chrono::{DateTime, Datelike, Timelike, Utc};
use tracing::instrument;

use secondbrain_audit::{AuditLogger, IdempotencyKey};
use secondbrain_kb::KnowledgeBase;
use secondbrain_timezone::TimeParser;

use crate::error::Result;

const MAX_CLARIFICATION_PREVIEW: usize = 5;

/// Renders the briefing body. Empty sections are omitted entirely rather
/// than shown with "(none)" — an empty briefing with no due/overdue/
/// clarification items still gets sent with a one-line "nothing on your
/// plate" body so the run's idempotency record reflects that it fired.
pub fn render(kb: &KnowledgeBase, parser: &TimeParser, now_utc: DateTime<Utc>) -> Result<String> {
    let tz = parser.default_timezone();
    let today = now_utc.with_timezone(&tz).date_naive();

    let tasks = kb.list_tasks(None, false)?;
    let mut due_today = Vec::new();
    let mut overdue = Vec::new();

    for task in &tasks {
        if !task.status.is_active() {
            continue;
        }
        let Some(due_at) = &task.due_at else { continue };
        let Ok(due_dt) = DateTime::parse_from_rfc3339(due_at) else { continue };
        let due_local = due_dt.with_timezone(&tz).date_naive();

        if due_local == today {
            due_today.push(task.title.clone());
        } else if due_local < today {
            overdue.push(task.title.clone());
        }
    }

    let clarification = kb.list_unprocessed_inbox_items()?;

    let mut sections = Vec::new();

    if !due_today.is_empty() {
        let mut section = String::from("DUE TODAY\n");
        for title in &due_today {
            section.push_str(&format!("- {title}\n"));
        }
        sections.push(section.trim_end().to_string());
    }

    if !overdue.is_empty() {
        let mut section = String::from("OVERDUE\n");
        for title in &overdue {
            section.push_str(&format!("- {title}\n"));
        }
        sections.push(section.trim_end().to_string());
    }

    if !clarification.is_empty() {
        let mut section = String::from("NEEDS CLARIFICATION\n");
        for item in clarification.iter().take(MAX_CLARIFICATION_PREVIEW) {
            section.push_str(&format!("- {}\n", item.raw_input));
        }
        if clarification.len() > MAX_CLARIFICATION_PREVIEW {
            section.push_str(&format!("...and {} more\n", clarification.len() - MAX_CLARIFICATION_PREVIEW));
        }
        sections.push(section.trim_end().to_string());
        sections.push("Reply /debrief to work through these.".to_string());
    }

    if sections.is_empty() {
        return Ok("Nothing due, overdue, or needing clarification. Clear plate today.".to_string());
    }

    Ok(sections.join("\n\n"))
}

/// Returns the briefing text exactly once per local calendar day per chat,
/// at the configured morning hour, idempotent via `briefing:<date>:<chat>`
/// (spec §4.13). Returns `None` outside the hour window or if already sent.
#[instrument(skip(kb, parser, audit))]
pub fn maybe_generate(
    kb: &KnowledgeBase,
    parser: &TimeParser,
    audit: &AuditLogger,
    chat_id: &str,
    briefing_hour: u8,
    now_utc: DateTime<Utc>,
) -> Result<Option<String>> {
    let tz = parser.default_timezone();
    let local_now = now_utc.with_timezone(&tz);

    if local_now.hour() != briefing_hour as u32 {
        return Ok(None);
    }

    let date = local_now.format("%Y-%m-%d").to_string();
    let key = IdempotencyKey::briefing(&date, chat_id);

    if !audit.ensure_new(kb, &key)? {
        return Ok(None);
    }

    let body = render(kb, parser, now_utc)?;
    audit.log_briefing(kb, &date, chat_id)?;

    Ok(Some(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secondbrain_core::ids::TaskId;
    use secondbrain_core::records::Task;
    use secondbrain_core::types::{CreatedBy, Priority, TaskStatus};

    fn make_task(title: &str, due_at: &str) -> Task {
        let now = Utc::now().to_rfc3339();
        Task {
            id: TaskId::new(),
            title: title.to_string(),
            status: TaskStatus::Todo,
            priority: Priority::Medium,
            due_at: Some(due_at.to_string()),
            due_timezone: Some("UTC".to_string()),
            source: None,
            confidence: None,
            created_by: CreatedBy::Human,
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
    fn empty_day_gets_a_clear_plate_message() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let parser = TimeParser::new("UTC");
        let body = render(&kb, &parser, Utc::now()).unwrap();
        assert!(body.contains("Clear plate"));
    }

    #[test]
    fn due_today_and_overdue_sections_appear() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let parser = TimeParser::new("UTC");
        let now = Utc::now();
        kb.create_task(&make_task("Submit report", &now.to_rfc3339())).unwrap();
        kb.create_task(&make_task("Pay invoice", &(now - chrono::Duration::days(2)).to_rfc3339())).unwrap();

        let body = render(&kb, &parser, now).unwrap();
        assert!(body.contains("DUE TODAY"));
        assert!(body.contains("Submit report"));
        assert!(body.contains("OVERDUE"));
        assert!(body.contains("Pay invoice"));
    }
}
