//! Entity extraction, lookup and linking (C2/C4/C5).
//!
//! `extract` is pure pattern matching over raw text. `people`/`places`/
//! `projects` resolve extracted mentions against the knowledge base with
//! confidence-scored disambiguation (spec §4.4). `link` composes them into
//! a single per-message resolution pass for the message processor.

mod cache;
pub mod confidence;
pub mod error;
pub mod extract;
pub mod link;
pub mod people;
pub mod places;
pub mod projects;

pub use error::{EntitiesError, Result};
