//! The three fixed local-time windows a nudge can fire in (spec §4.12).
//! Morning briefing has its own single-hour window, owned by
//! `secondbrain-briefing` rather than here — it dispatches a different kind
//! of message (a summary, not a per-task reminder).

use crate::types::NudgeType;

/// `[start, end)` hour-of-day, in the user's configured timezone.
#[derive(Debug, Clone, Copy)]
pub struct Window {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Window {
    pub fn contains(&self, hour: u32) -> bool {
        hour >= self.start_hour && hour < self.end_hour
    }
}

pub const DUE_TODAY_WINDOW: Window = Window { start_hour: 14, end_hour: 20 };
pub const DUE_TOMORROW_WINDOW: Window = Window { start_hour: 18, end_hour: 21 };
pub const OVERDUE_WINDOW: Window = Window { start_hour: 9, end_hour: 20 };

/// Whether `nudge_type` is allowed to fire at `local_hour`. `HighPriority`
/// rides the same window as `DueToday` since it's a due-today task with an
/// urgent/high priority upgrade, not a distinct schedule.
pub fn window_for(nudge_type: NudgeType) -> Window {
    match nudge_type {
        NudgeType::DueToday | NudgeType::HighPriority => DUE_TODAY_WINDOW,
        NudgeType::DueTomorrow => DUE_TOMORROW_WINDOW,
        NudgeType::Overdue => OVERDUE_WINDOW,
    }
}

pub fn is_in_window(nudge_type: NudgeType, local_hour: u32) -> bool {
    window_for(nudge_type).contains(local_hour)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_today_window_excludes_early_morning() {
        assert!(!is_in_window(NudgeType::DueToday, 9));
        assert!(is_in_window(NudgeType::DueToday, 14));
        assert!(!is_in_window(NudgeType::DueToday, 20));
    }

    #[test]
    fn overdue_window_spans_business_hours() {
        assert!(is_in_window(NudgeType::Overdue, 9));
        assert!(is_in_window(NudgeType::Overdue, 19));
        assert!(!is_in_window(NudgeType::Overdue, 20));
    }
}
