use std::sync::OnceLock;

use regex::{Regex, RegexSet};

/// Messages that read as a correction of the AI's last action (spec §4.7
/// `CORRECTION_PATTERNS`): "wrong", "that's not right", "I said X", "I
/// meant X", "should be X", undo/cancel/delete requests.
fn correction_patterns() -> &'static RegexSet {
    static RE: OnceLock<RegexSet> = OnceLock::new();
    RE.get_or_init(|| {
        RegexSet::new([
            r"(?i)^wrong\b",
            r"(?i)^that'?s wrong\b",
            r"(?i)^that'?s not (right|correct)\b",
            r"(?i)^no,?\s",
            r"(?i)^incorrect\b",
            r"(?i)^actually\b",
            r"(?i)^not (?:that|this)\b",
            r"(?i)i said\b",
            r"(?i)i meant\b",
            r"(?i)should (?:be|have been)\b",
            r"(?i)(?:it'?s|it was|that was)\s+\w+\s+not\s+\w+",
            r"(?i)^undo\b",
            r"(?i)^cancel\s+(?:that|this|it)\b",
            r"(?i)^delete\s+(?:that|this|it)\b",
        ])
        .unwrap()
    })
}

/// Requests to undo/cancel the last action outright, as opposed to
/// correcting a value (spec §4.7 `_is_undo_request`).
fn undo_request_patterns() -> &'static RegexSet {
    static RE: OnceLock<RegexSet> = OnceLock::new();
    RE.get_or_init(|| {
        RegexSet::new([
            r"(?i)^undo\b",
            r"(?i)^cancel\s+(?:that|this|it)\b",
            r"(?i)^delete\s+(?:that|this|it)\b",
            r"(?i)^remove\s+(?:that|this|it)\b",
            r"(?i)^never\s*mind\b",
            r"(?i)^forget\s+(?:that|this|it)\b",
        ])
        .unwrap()
    })
}

/// Ordered "correct not wrong" extraction patterns (spec §4.7
/// `CORRECTION_EXTRACTION_PATTERNS`). The last entry, "change X to Y",
/// captures in reverse order (wrong, correct) so it's flagged specially in
/// `extract_correction`.
fn extraction_patterns() -> &'static [(Regex, bool)] {
    static RE: OnceLock<Vec<(Regex, bool)>> = OnceLock::new();
    RE.get_or_init(|| {
        vec![
            (Regex::new(r"(?i)i said\s+['\x22]?([^'\x22]+?)['\x22]?\s+not\s+['\x22]?([^'\x22]+?)['\x22]?(?:\s|$|\.)").unwrap(), false),
            (Regex::new(r"(?i)i meant\s+['\x22]?([^'\x22]+?)['\x22]?\s+not\s+['\x22]?([^'\x22]+?)['\x22]?(?:\s|$|\.)").unwrap(), false),
            (Regex::new(r"(?i)should (?:be|have been)\s+['\x22]?([^'\x22]+?)['\x22]?\s+not\s+['\x22]?([^'\x22]+?)['\x22]?(?:\s|$|\.)").unwrap(), false),
            (Regex::new(r"(?i)(?:it'?s|it was|that'?s|that was)\s+['\x22]?([^'\x22]+?)['\x22]?\s+not\s+['\x22]?([^'\x22]+?)['\x22]?(?:\s|$|\.)").unwrap(), false),
            (Regex::new(r"(?i)wrong[,.]?\s+i said\s+['\x22]?([^'\x22]+?)['\x22]?(?:\s|$|\.)").unwrap(), false),
            (Regex::new(r"(?i)wrong[,.]?\s+(?:it'?s|it was|that'?s|that was)\s+['\x22]?([^'\x22]+?)['\x22]?(?:\s|$|\.)").unwrap(), false),
            (Regex::new(r"(?i)change\s+['\x22]?([^'\x22]+?)['\x22]?\s+to\s+['\x22]?([^'\x22]+?)['\x22]?(?:\s|$|\.)").unwrap(), true),
        ]
    })
}

pub fn is_correction_message(text: &str) -> bool {
    correction_patterns().is_match(text.trim())
}

pub fn is_undo_request(text: &str) -> bool {
    undo_request_patterns().is_match(text.trim().to_lowercase().as_str())
}

/// Extracts `(correct_value, wrong_value)` from a correction message, or
/// `(None, None)` if no pattern matched. `wrong_value` may be absent even
/// when `correct_value` is found (spec §4.7 `extract_correction`).
pub fn extract_correction(text: &str) -> (Option<String>, Option<String>) {
    let text = text.trim();
    for (pattern, swap) in extraction_patterns() {
        if let Some(captures) = pattern.captures(text) {
            let first = captures.get(1).map(|m| m.as_str().trim().to_string());
            let second = captures.get(2).map(|m| m.as_str().trim().to_string());
            return match (first, second) {
                (Some(a), Some(b)) if *swap => (Some(b), Some(a)),
                (Some(a), Some(b)) => (Some(a), Some(b)),
                (Some(a), None) => (Some(a), None),
                (None, _) => (None, None),
            };
        }
    }
    (None, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_correction_openers() {
        for text in ["Wrong, I said Tess not Jess", "actually it's Monday", "no, that's for tomorrow", "I meant the dentist"] {
            assert!(is_correction_message(text), "expected '{text}' to be recognized as a correction");
        }
    }

    #[test]
    fn ignores_unrelated_text() {
        assert!(!is_correction_message("buy groceries tomorrow"));
    }

    #[test]
    fn extracts_said_not_pair() {
        let (correct, wrong) = extract_correction("I said Tess not Jess");
        assert_eq!(correct.as_deref(), Some("Tess"));
        assert_eq!(wrong.as_deref(), Some("Jess"));
    }

    #[test]
    fn extracts_wrong_i_said_single_value() {
        let (correct, wrong) = extract_correction("Wrong, I said Tess");
        assert_eq!(correct.as_deref(), Some("Tess"));
        assert_eq!(wrong, None);
    }

    #[test]
    fn change_x_to_y_swaps_order() {
        let (correct, wrong) = extract_correction("change Jess to Tess");
        assert_eq!(correct.as_deref(), Some("Tess"));
        assert_eq!(wrong.as_deref(), Some("Jess"));
    }

    #[test]
    fn undo_request_recognized_distinct_from_generic_correction() {
        assert!(is_undo_request("undo that"));
        assert!(is_undo_request("never mind"));
        assert!(!is_undo_request("I said Tess not Jess"));
    }
}
