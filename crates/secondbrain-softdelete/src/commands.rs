use std::sync::OnceLock;

use regex::RegexSet;

/// Declarative registry of undo-command patterns (spec §9: "regex families
/// as data"). "undo", "restore", "bring that back", "undelete", "recover".
fn undo_patterns() -> &'static RegexSet {
    static RE: OnceLock<RegexSet> = OnceLock::new();
    RE.get_or_init(|| {
        RegexSet::new([
            r"(?i)^undo$",
            r"(?i)^undo\s*(?:that|this|it|last)?\s*$",
            r"(?i)^restore\b",
            r"(?i)^bring\s+(?:that|it)\s+back\b",
            r"(?i)^undelete\b",
            r"(?i)^recover\b",
        ])
        .unwrap()
    })
}

/// "delete that", "remove this", "forget it" (spec §4.7/§4.8).
fn delete_patterns() -> &'static RegexSet {
    static RE: OnceLock<RegexSet> = OnceLock::new();
    RE.get_or_init(|| {
        RegexSet::new([
            r"(?i)^delete\s+(?:that|this|it)\b",
            r"(?i)^remove\s+(?:that|this|it)\b",
            r"(?i)^forget\s+(?:that|this|it|about\s+(?:that|this|it))\b",
        ])
        .unwrap()
    })
}

pub fn is_undo_command(text: &str) -> bool {
    undo_patterns().is_match(text.trim())
}

pub fn is_delete_command(text: &str) -> bool {
    delete_patterns().is_match(text.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_undo_phrasings() {
        for text in ["undo", "Undo that", "restore it", "bring that back", "undelete", "recover"] {
            assert!(is_undo_command(text), "expected '{text}' to be an undo command");
        }
    }

    #[test]
    fn recognizes_delete_phrasings() {
        for text in ["delete that", "remove this", "forget it", "Forget about that"] {
            assert!(is_delete_command(text), "expected '{text}' to be a delete command");
        }
    }

    #[test]
    fn ignores_unrelated_text() {
        assert!(!is_undo_command("call Jess tomorrow"));
        assert!(!is_delete_command("buy groceries"));
    }
}
