//! Offline queue (C10): durable append-only fallback for when the
//! knowledge base is unreachable.
//!
//! Grounded on
//! `examples/original_source/src/assistant/services/offline_queue.py`.

mod action;
mod queue;

pub use action::{QueuedAction, QueuedActionType};
pub use queue::{OfflineQueue, QueueProcessResult};

/// Shown to the user immediately when an action had to be queued instead
/// of written straight through (spec §4.10 `get_offline_response`).
pub const OFFLINE_RESPONSE: &str = "Saved locally, will sync when the knowledge base is back.";

/// Queued actions are retried this many times before being dropped from
/// the retry set and reported as permanently failed (spec §4.10
/// `MAX_RETRIES`).
pub const MAX_RETRIES: u32 = 3;
