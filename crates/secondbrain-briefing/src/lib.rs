//! Briefing generator & clarification loop (C13).
//!
//! `morning::render`/`maybe_generate` compose the daily summary (DUE TODAY,
//! OVERDUE, NEEDS CLARIFICATION) keyed through `secondbrain-audit` so a
//! repeated scheduler run for the same day doesn't send twice.
//! `ClarificationLoop` drives the `/debrief` state machine over the
//! unprocessed-inbox backlog (spec §4.13).

pub mod clarification;
pub mod error;
pub mod morning;

pub use clarification::ClarificationLoop;
pub use error::{BriefingError, Result};
