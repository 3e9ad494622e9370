//! Nudge Engine tick loop (spec §4.12): scans the knowledge base for tasks
//! due today/tomorrow/overdue, classifies them, and dispatches at most one
//! message per task/type/day, gated by the fixed local-time windows and the
//! dedupe ledger. The tick-loop shape (`tokio::select!` between an interval
//! and a shutdown signal) keeps a "job" implicit — the whole task table is
//! rescanned every tick rather than persisted as rows in a jobs table,
//! since nudges are gated by window membership and a dedupe ledger instead
//! of a next-run schedule.

use chrono::{DateTime, Datelike, Timelike, Utc};
use tokio::sync::watch;
use tracing::{instrument, warn};

use secondbrain_audit::{AuditLogger, IdempotencyKey, LogActionParams};
use secondbrain_core::records::Task;
use secondbrain_core::types::ActionType;
use secondbrain_kb::KnowledgeBase;
use secondbrain_timezone::TimeParser;

use crate::dedupe::DedupeLedger;
use crate::error::Result;
use crate::types::{NudgeCandidate, NudgeType};
use crate::windows::is_in_window;

const TICK_INTERVAL_SECS: u64 = 60;

/// Scans `kb` for nudge-eligible tasks as of `now_utc` in `parser`'s
/// configured timezone, before any window or dedupe filtering.
pub fn scan(kb: &KnowledgeBase, parser: &TimeParser, now_utc: DateTime<Utc>) -> Result<Vec<NudgeCandidate>> {
    let tz = parser.default_timezone();
    let today_local = now_utc.with_timezone(&tz).date_naive();
    let tomorrow_local = today_local.succ_opt().unwrap_or(today_local);

    let tasks = kb.list_tasks(None, false)?;
    let mut candidates = Vec::new();

    for task in tasks {
        if !task.status.is_active() {
            continue;
        }
        let Some(due_at) = &task.due_at else { continue };
        let Ok(due_dt) = DateTime::parse_from_rfc3339(due_at) else { continue };
        let due_local = due_dt.with_timezone(&tz).date_naive();

        if due_local < today_local {
            let days_overdue = (today_local - due_local).num_days();
            candidates.push(NudgeCandidate { task_id: task.id.clone(), title: task.title.clone(), nudge_type: NudgeType::Overdue, days_overdue: Some(days_overdue) });
        } else if due_local == today_local {
            let nudge_type = if task.priority.is_high_or_urgent() { NudgeType::HighPriority } else { NudgeType::DueToday };
            candidates.push(NudgeCandidate { task_id: task.id.clone(), title: task.title.clone(), nudge_type, days_overdue: None });
        } else if due_local == tomorrow_local {
            candidates.push(NudgeCandidate { task_id: task.id.clone(), title: task.title.clone(), nudge_type: NudgeType::DueTomorrow, days_overdue: None });
        }
    }

    Ok(candidates)
}

/// One candidate that survived window + dedupe filtering, ready to send.
#[derive(Debug, Clone)]
pub struct NudgeDispatch {
    pub task: Task,
    pub nudge_type: NudgeType,
    pub message: String,
}

pub struct NudgeEngine<'a> {
    kb: &'a KnowledgeBase,
    parser: &'a TimeParser,
    audit: &'a AuditLogger,
    ledger: DedupeLedger,
}

impl<'a> NudgeEngine<'a> {
    pub fn new(kb: &'a KnowledgeBase, parser: &'a TimeParser, audit: &'a AuditLogger, ledger: DedupeLedger) -> Self {
        Self { kb, parser, audit, ledger }
    }

    /// Runs one scan against `now_utc`, filters by window membership and
    /// the dedupe ledger, logs each dispatch via the audit trail, and
    /// returns the messages ready to hand to a `Channel::send`.
    #[instrument(skip(self))]
    pub fn tick(&mut self, now_utc: DateTime<Utc>) -> Result<Vec<NudgeDispatch>> {
        let tz = self.parser.default_timezone();
        let local_now = now_utc.with_timezone(&tz);
        let local_hour = local_now.hour();
        let yyyy_mm_dd = local_now.format("%Y-%m-%d").to_string();

        let candidates = scan(self.kb, self.parser, now_utc)?;
        let mut dispatches = Vec::new();

        for candidate in candidates {
            if !is_in_window(candidate.nudge_type, local_hour) {
                continue;
            }
            if self.ledger.was_sent(candidate.task_id.as_ref(), candidate.nudge_type, &yyyy_mm_dd) {
                continue;
            }

            let Some(task) = self.kb.get_task(&candidate.task_id)? else { continue };
            let message = candidate.message();
            let key = IdempotencyKey::nudge(candidate.task_id.as_ref(), &candidate.nudge_type.to_string(), &yyyy_mm_dd);

            match self.audit.ensure_new(self.kb, &key) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(err) => {
                    warn!(%err, task_id = %candidate.task_id, "failed to check nudge idempotency, skipping");
                    continue;
                }
            }

            let params = LogActionParams::new(ActionType::Send, key, message.clone()).with_entities(vec![candidate.task_id.to_string()]);
            if let Err(err) = self.audit.log_action(self.kb, params) {
                warn!(%err, task_id = %candidate.task_id, "failed to log nudge dispatch");
            }

            if let Err(err) = self.ledger.mark_sent(candidate.task_id.as_ref(), candidate.nudge_type, &yyyy_mm_dd) {
                warn!(%err, task_id = %candidate.task_id, "failed to persist dedupe ledger entry");
            }

            dispatches.push(NudgeDispatch { task, nudge_type: candidate.nudge_type, message });
        }

        Ok(dispatches)
    }
}

/// Runs `engine.tick()` every `TICK_INTERVAL_SECS` until `shutdown` fires,
/// handing each tick's dispatches to `on_dispatch`.
pub async fn run(mut engine: NudgeEngine<'_>, mut shutdown: watch::Receiver<bool>, mut on_dispatch: impl FnMut(NudgeDispatch)) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(TICK_INTERVAL_SECS));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match engine.tick(Utc::now()) {
                    Ok(dispatches) => {
                        for dispatch in dispatches {
                            on_dispatch(dispatch);
                        }
                    }
                    Err(err) => warn!(%err, "nudge engine tick failed"),
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secondbrain_core::ids::TaskId;
    use secondbrain_core::types::{CreatedBy, Priority, TaskStatus};

    fn make_task(due_at: &str, priority: Priority) -> Task {
        let now = Utc::now().to_rfc3339();
        Task {
            id: TaskId::new(),
            title: "Finish report".to_string(),
            status: TaskStatus::Todo,
            priority,
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
    fn overdue_task_is_classified_with_days_count() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let parser = TimeParser::new("UTC");
        let now = Utc::now();
        let task = make_task(&(now - chrono::Duration::days(3)).to_rfc3339(), Priority::Medium);
        kb.create_task(&task).unwrap();

        let candidates = scan(&kb, &parser, now).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].nudge_type, NudgeType::Overdue);
        assert_eq!(candidates[0].days_overdue, Some(3));
    }

    #[test]
    fn high_priority_due_today_upgrades_nudge_type() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let parser = TimeParser::new("UTC");
        let now = Utc::now();
        let task = make_task(&now.to_rfc3339(), Priority::Urgent);
        kb.create_task(&task).unwrap();

        let candidates = scan(&kb, &parser, now).unwrap();
        assert_eq!(candidates[0].nudge_type, NudgeType::HighPriority);
        assert_eq!(candidates[0].message(), format!("Urgent reminder: {}", task.title));
    }
}
