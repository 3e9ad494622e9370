//! Shared types, configuration and error taxonomy for the Second Brain
//! message broker.
//!
//! Every other `secondbrain-*` crate depends on this one for its id types,
//! its `Error`/`Result`, and the `SecondBrainConfig` it loads at startup.
//! No crate in this workspace holds a module-level singleton — construction
//! happens once in `secondbrain-app` and shared references are passed down
//! to the orchestrators.

pub mod config;
pub mod delivery;
pub mod error;
pub mod ids;
pub mod records;
pub mod types;

pub use config::SecondBrainConfig;
pub use error::{Error, ErrorKind, Result};
