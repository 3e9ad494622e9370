/// Lowercases, strips, and removes the punctuation set that doesn't affect
/// meaning for pattern comparison (spec §4.6 step 1).
pub fn normalize(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '.' | ',' | '!' | '?' | ';' | ':' | '\'' | '"' | '-'))
        .collect()
}

/// Cheap character-overlap similarity ratio, deliberately not edit-distance
/// (spec §9 Open Question: keep as-is unless detection thresholds change).
///
/// `(matching_positions - |len1-len2|*0.5) / max(len1, len2)`
pub fn string_similarity(s1: &str, s2: &str) -> f64 {
    if s1.is_empty() || s2.is_empty() {
        return 0.0;
    }
    if s1 == s2 {
        return 1.0;
    }

    let c1: Vec<char> = s1.chars().collect();
    let c2: Vec<char> = s2.chars().collect();
    let (len1, len2) = (c1.len(), c2.len());
    let max_len = len1.max(len2) as f64;

    let matching = c1.iter().zip(c2.iter()).filter(|(a, b)| a == b).count() as f64;
    let extra_chars = (len1 as f64 - len2 as f64).abs();

    (matching - extra_chars * 0.5) / max_len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_punctuation_and_case() {
        assert_eq!(normalize("  Call Jess! "), "call jess");
        assert_eq!(normalize("It's not right."), "its not right");
    }

    #[test]
    fn similarity_is_one_for_equal_strings() {
        assert_eq!(string_similarity("jess", "jess"), 1.0);
    }

    #[test]
    fn similarity_rewards_overlap_and_penalizes_length_gap() {
        let sim = string_similarity("jess", "jessica");
        assert!(sim > 0.0 && sim < 1.0);
    }

    #[test]
    fn similarity_is_zero_for_empty_input() {
        assert_eq!(string_similarity("", "jess"), 0.0);
    }
}
