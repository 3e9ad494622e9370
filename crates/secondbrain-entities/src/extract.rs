//! Entity extraction (C2): pure pattern matching over raw message text.
//! No I/O, no LLM calls — the message processor consults this before
//! falling back to the external interpreter (spec §4.2).
//!
//! Grounded on `examples/original_source/src/assistant/services/entities.py`
//! (`EntityExtractor`) for the exact confidence tiers and strategy order.

use std::collections::HashSet;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use secondbrain_timezone::{ParsedInstant, TimeParser};

/// A person name spotted in text, with the strategy-derived confidence that
/// produced it (0-100).
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPerson {
    pub name: String,
    pub confidence: u8,
    pub context: String,
}

/// A place name spotted in text.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPlace {
    pub name: String,
    pub confidence: u8,
    pub context: String,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractedEntities {
    pub people: Vec<ExtractedPerson>,
    pub places: Vec<ExtractedPlace>,
    /// Instants parsed from the same text (C1), at most one per message
    /// today since `TimeParser::parse` returns its first match.
    pub dates: Vec<ParsedInstant>,
}

/// Words that look like capitalized names but are calendar vocabulary, not
/// people (spec §4.2).
const NOT_PEOPLE: &[&str] = &[
    "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday", "january", "february", "march",
    "april", "may", "june", "july", "august", "september", "october", "november", "december", "morning",
    "afternoon", "evening", "night", "today", "tomorrow", "yesterday",
];

const NON_PERSON_PREFIXES: &[&str] = &["i", "the", "a", "an", "at", "on", "in", "to", "from", "by"];

fn with_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bwith\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)").unwrap())
}

fn action_patterns() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        vec![
            Regex::new(r"\b(?:[Cc]all|[Ee]mail|[Tt]ext|[Mm]eet|[Ss]ee|[Cc]ontact)\s+([A-Z][a-z]+)").unwrap(),
            Regex::new(r"\b[Tt]ell\s+([A-Z][a-z]+)").unwrap(),
            Regex::new(r"\b[Aa]sk\s+([A-Z][a-z]+)").unwrap(),
        ]
    })
}

fn place_patterns() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        vec![
            Regex::new(r"at\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+){0,3})").unwrap(),
            Regex::new(r"(?:near|by|around)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+){0,3})").unwrap(),
            Regex::new(r"(?:going to|heading to|meet at)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+){0,3})").unwrap(),
        ]
    })
}

/// Runs all three C2 strategies over `text`: people, places, and (spec
/// §4.2 strategy 5) date/time fragments via C1's `TimeParser`. `now_utc` is
/// the instant relative-time fragments ("in 2 hours", bare "2pm") resolve
/// against.
pub fn extract(text: &str, parser: &TimeParser, now_utc: DateTime<Utc>) -> ExtractedEntities {
    ExtractedEntities {
        people: extract_people(text),
        places: extract_places(text),
        dates: parser.parse(text, now_utc).into_iter().collect(),
    }
}

/// Extracts person names using three strategies of decreasing confidence:
/// `with Name` (90), `call/email/text/meet/see/contact/tell/ask Name` (85),
/// and bare mid-sentence capitalized words (60).
pub fn extract_people(text: &str) -> Vec<ExtractedPerson> {
    let mut people = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for cap in with_pattern().captures_iter(text) {
        let name = cap[1].to_string();
        if !NOT_PEOPLE.contains(&name.to_lowercase().as_str()) && !seen.contains(&name) {
            people.push(ExtractedPerson {
                name: name.clone(),
                confidence: 90,
                context: cap[0].to_string(),
            });
            seen.insert(name);
        }
    }

    for pattern in action_patterns() {
        for cap in pattern.captures_iter(text) {
            let name = cap[1].to_string();
            if !NOT_PEOPLE.contains(&name.to_lowercase().as_str()) && !seen.contains(&name) {
                people.push(ExtractedPerson {
                    name: name.clone(),
                    confidence: 85,
                    context: cap[0].to_string(),
                });
                seen.insert(name);
            }
        }
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    for (i, word) in words.iter().enumerate() {
        if i == 0 {
            continue;
        }
        if let Some(prev) = words.get(i - 1) {
            if prev.ends_with(['.', '!', '?']) {
                continue;
            }
        }
        if word.chars().next().map(|c| c.is_uppercase()).unwrap_or(false) && word.len() > 1 {
            let clean = word.trim_end_matches([',', '.', '!', '?', ';', ':']);
            if NOT_PEOPLE.contains(&clean.to_lowercase().as_str()) {
                continue;
            }
            if let Some(prev) = words.get(i - 1) {
                if NON_PERSON_PREFIXES.contains(&prev.to_lowercase().as_str()) {
                    continue;
                }
            }
            if seen.contains(clean) {
                continue;
            }
            let start = i.saturating_sub(2);
            let end = (i + 2).min(words.len());
            people.push(ExtractedPerson {
                name: clean.to_string(),
                confidence: 60,
                context: words[start..end].join(" "),
            });
            seen.insert(clean.to_string());
        }
    }

    people
}

/// Extracts place names from `at/near/by/around/going to/heading to/meet at`
/// prefixes, confidence fixed at 80 (spec §4.2).
pub fn extract_places(text: &str) -> Vec<ExtractedPlace> {
    let mut places = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for pattern in place_patterns() {
        for cap in pattern.captures_iter(text) {
            let name = cap[1].to_string();
            if !NOT_PEOPLE.contains(&name.to_lowercase().as_str()) && !seen.contains(&name) {
                places.push(ExtractedPlace {
                    name: name.clone(),
                    confidence: 80,
                    context: cap[0].to_string(),
                });
                seen.insert(name);
            }
        }
    }

    places
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_pattern_yields_high_confidence() {
        let found = extract_people("Grab lunch with Sarah tomorrow");
        assert_eq!(found[0].name, "Sarah");
        assert_eq!(found[0].confidence, 90);
    }

    #[test]
    fn action_verb_pattern_detected() {
        let found = extract_people("Call Bob about the invoice");
        assert!(found.iter().any(|p| p.name == "Bob" && p.confidence == 85));
    }

    #[test]
    fn calendar_words_are_not_people() {
        let found = extract_people("Meeting is on Monday afternoon");
        assert!(!found.iter().any(|p| p.name == "Monday"));
    }

    #[test]
    fn place_prefix_detected() {
        let found = extract_places("Let's meet at Starbucks downtown");
        assert_eq!(found[0].name, "Starbucks");
        assert_eq!(found[0].confidence, 80);
    }
}
