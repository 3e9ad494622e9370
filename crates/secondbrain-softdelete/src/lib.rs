//! Soft-delete service (C8): mark-deleted with a 30-day undo window.
//!
//! Grounded on
//! `examples/original_source/src/assistant/services/soft_delete.py`
//! (`UNDO_WINDOW_DAYS = 30`, `MAX_DELETED_ITEMS = 50` per-chat ring).

mod commands;
mod service;
mod types;

pub use commands::{is_delete_command, is_undo_command};
pub use service::SoftDeleteService;
pub use types::{DeleteResult, DeletedAction, EntityType, UndoResult};
