//! Schedule-conflict orchestration (SPEC_FULL §11.3): before a dated
//! Task is created, checks whether another active task sits within 30
//! minutes of it at the same place. Grounded on
//! `services/schedule_conflict.py`'s overlap-detection shape, scoped
//! down to pure overlap checking — the original's travel-time/maps
//! client is an external collaborator out of scope (spec §1).

use chrono::{DateTime, Utc};

use secondbrain_core::ids::PlaceId;
use secondbrain_core::records::Task;
use secondbrain_kb::KnowledgeBase;

use crate::error::Result;

const CONFLICT_WINDOW_MINUTES: i64 = 30;

/// Finds the nearest active task at `place_id` whose due instant falls
/// within ±30 minutes of `due_at`, if any.
pub fn find_conflict(kb: &KnowledgeBase, place_id: &PlaceId, due_at: DateTime<Utc>) -> Result<Option<Task>> {
    let tasks = kb.list_tasks(None, false)?;

    let conflict = tasks
        .into_iter()
        .filter(|t| t.status.is_active())
        .filter(|t| t.place_id.as_ref() == Some(place_id))
        .filter_map(|t| {
            let other_due = t.due_at.as_deref().and_then(|s| DateTime::parse_from_rfc3339(s).ok())?;
            let delta = (other_due.with_timezone(&Utc) - due_at).num_minutes().abs();
            (delta <= CONFLICT_WINDOW_MINUTES).then_some((delta, t))
        })
        .min_by_key(|(delta, _)| *delta)
        .map(|(_, t)| t);

    Ok(conflict)
}

/// Appends a non-blocking conflict notice to a response, or returns it
/// unchanged when there's no conflicting task.
pub fn append_notice(response: &str, conflict: Option<&Task>) -> String {
    match conflict {
        Some(other) => format!("{response} (heads up: overlaps with {})", other.title),
        None => response.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use secondbrain_core::ids::TaskId;
    use secondbrain_core::types::{CreatedBy, Priority, Source, TaskStatus};

    fn make_task(title: &str, due_at: DateTime<Utc>, place_id: PlaceId) -> Task {
        let now = Utc::now().to_rfc3339();
        Task {
            id: TaskId::new(),
            title: title.to_string(),
            status: TaskStatus::Todo,
            priority: Priority::Medium,
            due_at: Some(due_at.to_rfc3339()),
            due_timezone: Some("UTC".to_string()),
            source: Some(Source::TelegramText),
            confidence: None,
            created_by: CreatedBy::Ai,
            person_ids: vec![],
            place_id: Some(place_id),
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
    fn flags_an_overlapping_task_at_the_same_place() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let place = PlaceId::new();
        let base = Utc::now();
        kb.create_task(&make_task("Dentist", base, place.clone())).unwrap();

        let conflict = find_conflict(&kb, &place, base + Duration::minutes(20)).unwrap();
        assert_eq!(conflict.unwrap().title, "Dentist");
    }

    #[test]
    fn ignores_tasks_outside_the_window() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let place = PlaceId::new();
        let base = Utc::now();
        kb.create_task(&make_task("Dentist", base, place.clone())).unwrap();

        let conflict = find_conflict(&kb, &place, base + Duration::minutes(45)).unwrap();
        assert!(conflict.is_none());
    }

    #[test]
    fn ignores_tasks_at_a_different_place() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let place_a = PlaceId::new();
        let place_b = PlaceId::new();
        let base = Utc::now();
        kb.create_task(&make_task("Dentist", base, place_a)).unwrap();

        let conflict = find_conflict(&kb, &place_b, base).unwrap();
        assert!(conflict.is_none());
    }

    #[test]
    fn notice_is_appended_only_when_a_conflict_exists() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let place = PlaceId::new();
        let base = Utc::now();
        let other = make_task("Dentist", base, place.clone());
        kb.create_task(&other).unwrap();

        let conflict = find_conflict(&kb, &place, base).unwrap();
        let response = append_notice("Got it. Team sync.", conflict.as_ref());
        assert_eq!(response, "Got it. Team sync. (heads up: overlaps with Dentist)");
        assert_eq!(append_notice("Got it. Team sync.", None), "Got it. Team sync.");
    }
}
