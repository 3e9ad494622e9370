use std::sync::RwLock;

use chrono::Utc;

use secondbrain_core::ids::PatternId;
use secondbrain_core::records::{Pattern, PatternType};
use secondbrain_kb::KnowledgeBase;

use crate::normalize::normalize;
use crate::PATTERN_CONFIDENCE_THRESHOLD;

/// Record of a pattern applied to one extracted entity or title (spec
/// §4.6 Applicator state).
#[derive(Debug, Clone)]
pub struct AppliedPattern {
    pub pattern_id: PatternId,
    pub trigger: String,
    pub meaning: String,
    pub original_value: String,
    pub corrected_value: String,
    pub pattern_type: Option<PatternType>,
    pub confidence: u8,
}

/// Applies stored patterns to newly extracted people/places/titles before
/// linking (spec §4.6). Grounded on
/// `examples/original_source/src/assistant/services/pattern_applicator.py`.
///
/// Holds an in-memory cache of applicable patterns (`confidence >= 70`)
/// loaded at startup and refreshed on demand — read-only between refreshes
/// (spec §5 "Pattern cache").
pub struct PatternApplicator {
    cache: RwLock<Vec<Pattern>>,
}

impl Default for PatternApplicator {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternApplicator {
    pub fn new() -> Self {
        Self { cache: RwLock::new(Vec::new()) }
    }

    /// (Re)loads the applicable-pattern cache from the knowledge base.
    pub fn refresh(&self, kb: &KnowledgeBase) -> secondbrain_kb::Result<usize> {
        let all = kb.list_patterns()?;
        let applicable: Vec<Pattern> = all
            .into_iter()
            .filter(|p| p.confidence >= PATTERN_CONFIDENCE_THRESHOLD)
            .collect();
        let count = applicable.len();
        *self.cache.write().unwrap() = applicable;
        Ok(count)
    }

    fn matches_trigger(value: &str, trigger: &str) -> bool {
        let norm_value = normalize(value);
        let norm_trigger = normalize(trigger);

        if norm_value == norm_trigger {
            return true;
        }
        if norm_value.contains(&norm_trigger) {
            return true;
        }
        if norm_trigger.contains(&norm_value) && norm_value.len() >= 3 {
            return true;
        }
        false
    }

    fn find_match(&self, value: &str) -> Option<Pattern> {
        self.cache.read().unwrap().iter().find(|p| Self::matches_trigger(value, &p.trigger)).cloned()
    }

    /// Rewrites `people`/`places` in place against the first matching
    /// pattern each, and rewrites `title` wherever it case-insensitively
    /// contains a rewritten value. At most one pattern applies per entity
    /// instance (spec §4.6 "Apply algorithm").
    pub fn apply(&self, people: &mut [String], places: &mut [String], title: &mut String) -> Vec<AppliedPattern> {
        let mut applied = Vec::new();

        for person in people.iter_mut() {
            if let Some(pattern) = self.find_match(person) {
                let original = person.clone();
                *person = pattern.meaning.clone();
                replace_in_title_case_insensitive(title, &original, &pattern.meaning);
                applied.push(to_applied(&pattern, original, pattern.meaning.clone()));
            }
        }

        for place in places.iter_mut() {
            if let Some(pattern) = self.find_match(place) {
                let original = place.clone();
                *place = pattern.meaning.clone();
                replace_in_title_case_insensitive(title, &original, &pattern.meaning);
                applied.push(to_applied(&pattern, original, pattern.meaning.clone()));
            }
        }

        // Title-only patterns: recorded but do not edit the title text
        // (spec §4.6: "may later influence priority classification").
        let norm_title = normalize(title);
        for pattern in self.cache.read().unwrap().iter() {
            let norm_trigger = normalize(&pattern.trigger);
            if norm_trigger.is_empty() || !norm_title.contains(&norm_trigger) {
                continue;
            }
            if applied.iter().any(|a| a.pattern_id == pattern.id) {
                continue;
            }
            applied.push(to_applied(pattern, pattern.trigger.clone(), pattern.meaning.clone()));
        }

        applied
    }

    /// Updates a pattern's `last_used` timestamp after it has been applied.
    pub fn mark_used(&self, kb: &KnowledgeBase, pattern_id: &PatternId) -> secondbrain_kb::Result<()> {
        if let Some(mut pattern) = kb.get_pattern(pattern_id)? {
            pattern.last_used = Utc::now().to_rfc3339();
            kb.update_pattern(&pattern)?;
        }
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        !self.cache.read().unwrap().is_empty()
    }
}

fn to_applied(pattern: &Pattern, original_value: String, corrected_value: String) -> AppliedPattern {
    AppliedPattern {
        pattern_id: pattern.id.clone(),
        trigger: pattern.trigger.clone(),
        meaning: pattern.meaning.clone(),
        original_value,
        corrected_value,
        pattern_type: pattern.pattern_type,
        confidence: pattern.confidence,
    }
}

fn replace_in_title_case_insensitive(title: &mut String, needle: &str, replacement: &str) {
    if needle.is_empty() {
        return;
    }
    let lower_title = title.to_lowercase();
    let lower_needle = needle.to_lowercase();
    if let Some(pos) = lower_title.find(&lower_needle) {
        let end = pos + needle.len();
        if end <= title.len() {
            title.replace_range(pos..end, replacement);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secondbrain_core::ids::PatternId;

    fn pattern(trigger: &str, meaning: &str, confidence: u8) -> Pattern {
        Pattern {
            id: PatternId::new(),
            trigger: trigger.to_string(),
            meaning: meaning.to_string(),
            confidence,
            times_confirmed: 3,
            pattern_type: Some(PatternType::Person),
            last_used: Utc::now().to_rfc3339(),
        }
    }

    #[test]
    fn applies_first_matching_pattern_to_person_and_title() {
        let applicator = PatternApplicator::new();
        *applicator.cache.write().unwrap() = vec![pattern("Jess", "Tess", 80)];

        let mut people = vec!["Jess".to_string()];
        let mut places = vec![];
        let mut title = "Call Jess tomorrow".to_string();

        let applied = applicator.apply(&mut people, &mut places, &mut title);

        assert_eq!(people[0], "Tess");
        assert_eq!(title, "Call Tess tomorrow");
        assert_eq!(applied.len(), 1);
    }

    #[test]
    fn title_only_pattern_is_recorded_but_title_untouched() {
        let applicator = PatternApplicator::new();
        *applicator.cache.write().unwrap() = vec![pattern("shopping", "low-priority", 80)];

        let mut people = vec![];
        let mut places = vec![];
        let mut title = "Buy shopping list".to_string();

        let applied = applicator.apply(&mut people, &mut places, &mut title);

        assert_eq!(title, "Buy shopping list");
        assert_eq!(applied.len(), 1);
    }

    #[test]
    fn non_matching_pattern_leaves_values_untouched() {
        let applicator = PatternApplicator::new();
        *applicator.cache.write().unwrap() = vec![pattern("Jess", "Tess", 80)];

        let mut people = vec!["Sam".to_string()];
        let mut places = vec![];
        let mut title = "Meet Sam".to_string();

        let applied = applicator.apply(&mut people, &mut places, &mut title);
        assert!(applied.is_empty());
        assert_eq!(people[0], "Sam");
    }
}
