use secondbrain_core::ids::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NudgeType {
    DueToday,
    DueTomorrow,
    Overdue,
    HighPriority,
}

impl std::fmt::Display for NudgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            NudgeType::DueToday => "due_today",
            NudgeType::DueTomorrow => "due_tomorrow",
            NudgeType::Overdue => "overdue",
            NudgeType::HighPriority => "high_priority",
        })
    }
}

/// A task that's eligible to be nudged about this tick (spec §4.12
/// `NudgeCandidate`), before the dedupe ledger has filtered it.
#[derive(Debug, Clone)]
pub struct NudgeCandidate {
    pub task_id: TaskId,
    pub title: String,
    pub nudge_type: NudgeType,
    pub days_overdue: Option<i64>,
}

impl NudgeCandidate {
    /// Exact literal dispatch text (spec §4.12) — never reworded per task.
    pub fn message(&self) -> String {
        match self.nudge_type {
            NudgeType::DueToday => format!("Don't forget: {} is due today", self.title),
            NudgeType::DueTomorrow => format!("Heads up: {} is due tomorrow", self.title),
            NudgeType::Overdue => format!("Overdue ({} days): {}", self.days_overdue.unwrap_or(0), self.title),
            NudgeType::HighPriority => format!("Urgent reminder: {}", self.title),
        }
    }
}
