//! Nudge Engine (C12): periodic scan of due/overdue tasks, gated by the
//! three fixed local-time windows and a file-backed dedupe ledger. Nudges
//! aren't persisted as scheduled jobs — every tick rescans the live task
//! table instead.

pub mod dedupe;
pub mod engine;
pub mod error;
pub mod types;
pub mod windows;

pub use dedupe::DedupeLedger;
pub use engine::{run, scan, NudgeDispatch, NudgeEngine};
pub use error::{Result, SchedulerError};
pub use types::{NudgeCandidate, NudgeType};
