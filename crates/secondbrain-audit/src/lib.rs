//! Audit logger & idempotency index (C9).
//!
//! Built around a `log_entries` table with a unique index on
//! `idempotency_key`, plus the key-format conventions in
//! `examples/original_source/src/assistant/services/corrections.py`
//! (`telegram:<chat>:<msg>`, `undo:<chat>:<msg>`, `correction:<chat>:<msg>`)
//! generalized per spec §4.9/§6.
//!
//! The only writer of the idempotency index is `create_log_entry` (spec
//! §4.3). This crate layers a read-mostly in-memory cache in front of that
//! write path so repeat lookups for the same key in one process don't all
//! round-trip the knowledge base.

mod key;
mod logger;

pub use key::IdempotencyKey;
pub use logger::{AuditLogger, IdempotencyCheck, LogActionParams};
