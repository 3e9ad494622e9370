//! Task vs. inbox-item classification (spec §4.11 step 6d): a message
//! becomes a Task when it names a date/time or opens with an imperative
//! verb; everything else lands in the inbox for later clarification.

use std::sync::OnceLock;

use regex::RegexSet;

const IMPERATIVE_VERBS: &[&str] = &[
    "call", "email", "text", "message", "meet", "buy", "pick up", "book", "pay", "send", "finish",
    "submit", "schedule", "renew", "cancel", "confirm", "review", "sign", "return", "order",
    "drop off", "pick", "visit", "attend", "prepare", "write", "read",
];

fn imperative_patterns() -> &'static RegexSet {
    static RE: OnceLock<RegexSet> = OnceLock::new();
    RE.get_or_init(|| {
        let patterns: Vec<String> = IMPERATIVE_VERBS.iter().map(|v| format!(r"(?i)^{v}\b")).collect();
        RegexSet::new(patterns).expect("imperative verb patterns are valid regex")
    })
}

/// `true` when the text opens with a recognized imperative verb.
pub fn starts_with_imperative(text: &str) -> bool {
    imperative_patterns().is_match(text.trim())
}

/// Whether a message should become a Task rather than an inbox item:
/// a date was parsed out of it, or it opens with an imperative verb.
pub fn is_task_like(text: &str, has_date: bool) -> bool {
    has_date || starts_with_imperative(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imperative_opener_is_task_like() {
        assert!(is_task_like("call the dentist tomorrow", false));
        assert!(is_task_like("buy milk", false));
    }

    #[test]
    fn dated_text_without_a_verb_is_still_task_like() {
        assert!(is_task_like("dentist appointment friday at 2pm", true));
    }

    #[test]
    fn plain_note_is_not_task_like() {
        assert!(!is_task_like("thinking about switching apartments", false));
    }
}
