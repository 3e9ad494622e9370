//! Pattern memory (C6): detects repeated corrections and persists them as
//! reusable rules, then applies those rules to future extractions before
//! linking.
//!
//! Grounded on `examples/original_source/src/assistant/services/{patterns,
//! pattern_applicator}.py`. Two structs, no module singleton: `Application`
//! constructs one `PatternDetector` and one `PatternApplicator` and passes
//! them to the message processor.

pub mod applicator;
pub mod detector;
mod normalize;

pub use applicator::{AppliedPattern, PatternApplicator};
pub use detector::{CorrectionRecord, DetectedPattern, PatternDetector};

/// Patterns with fewer occurrences are never persisted (spec §3 invariant:
/// `times_confirmed >= 3` for stored patterns).
pub const MIN_PATTERN_OCCURRENCES: usize = 3;

/// Confidence at/above which a pattern is auto-applied (spec §3/§4.6).
pub const PATTERN_CONFIDENCE_THRESHOLD: u8 = 70;

const INITIAL_PATTERN_CONFIDENCE: u8 = 50;
const CONFIDENCE_BOOST_PER_CONFIRMATION: u8 = 10;
