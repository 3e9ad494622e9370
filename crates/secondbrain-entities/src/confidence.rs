//! Shared disambiguation vocabulary for People/Places/Projects lookups
//! (C4/C5). The three services compute confidence differently but resolve
//! multiple matches with the same rule (spec §4.4):
//!
//! 0 matches → not found. 1 match → return it. ≥2 matches → sort by
//! (confidence desc, recency desc), then: if the best match's confidence is
//! ≥0.9, take it; else prefer the first top-priority match (partner/family
//! for people, home/office for places, active for projects) with confidence
//! ≥0.7; otherwise flag `needs_disambiguation`.

pub trait Candidate {
    fn confidence(&self) -> f64;
    /// Partner/Family relationship, Home/Office place type, Active project
    /// status — the attribute that breaks a disambiguation tie.
    fn is_top_priority(&self) -> bool;
    /// RFC3339 timestamp used for the recency tie-break, if known.
    fn recency_key(&self) -> Option<&str>;
}

/// Sorts `matches` in place and returns `(best_index, needs_disambiguation)`.
/// Panics if `matches` is empty — callers must check for the zero-match case
/// themselves (it has no best index to report).
pub fn disambiguate<T: Candidate>(matches: &mut [T]) -> (usize, bool) {
    assert!(!matches.is_empty(), "disambiguate called with no candidates");

    if matches.len() == 1 {
        return (0, false);
    }

    matches.sort_by(|a, b| {
        b.confidence()
            .partial_cmp(&a.confidence())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.recency_key().cmp(&a.recency_key()))
    });

    if matches[0].confidence() >= 0.9 {
        return (0, false);
    }

    if let Some(idx) = matches
        .iter()
        .position(|m| m.is_top_priority() && m.confidence() >= 0.7)
    {
        return (idx, false);
    }

    (0, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fake {
        confidence: f64,
        top_priority: bool,
        recency: Option<String>,
    }

    impl Candidate for Fake {
        fn confidence(&self) -> f64 {
            self.confidence
        }
        fn is_top_priority(&self) -> bool {
            self.top_priority
        }
        fn recency_key(&self) -> Option<&str> {
            self.recency.as_deref()
        }
    }

    #[test]
    fn single_match_never_needs_disambiguation() {
        let mut matches = vec![Fake { confidence: 0.5, top_priority: false, recency: None }];
        assert_eq!(disambiguate(&mut matches), (0, false));
    }

    #[test]
    fn high_confidence_best_short_circuits() {
        let mut matches = vec![
            Fake { confidence: 0.95, top_priority: false, recency: None },
            Fake { confidence: 0.6, top_priority: true, recency: None },
        ];
        let (idx, needs) = disambiguate(&mut matches);
        assert_eq!(idx, 0);
        assert!(!needs);
    }

    #[test]
    fn top_priority_breaks_tie_below_threshold() {
        let mut matches = vec![
            Fake { confidence: 0.7, top_priority: false, recency: None },
            Fake { confidence: 0.7, top_priority: true, recency: None },
        ];
        let (idx, needs) = disambiguate(&mut matches);
        assert!(!needs);
        assert!(matches[idx].top_priority);
    }

    #[test]
    fn ambiguous_when_nothing_breaks_the_tie() {
        let mut matches = vec![
            Fake { confidence: 0.6, top_priority: false, recency: None },
            Fake { confidence: 0.6, top_priority: false, recency: None },
        ];
        let (_, needs) = disambiguate(&mut matches);
        assert!(needs);
    }
}
