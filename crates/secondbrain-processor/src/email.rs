//! Email intelligence (SPEC_FULL §11.1, grounded on
//! `services/email_scanner.py` / `email_auto_reply.py`): learns each
//! sender's greeting, sign-off and tone from recent outbound replies,
//! caches the pattern for 24h, and advises whether a reply can be sent
//! without a human in the loop. The email transport itself is an
//! external collaborator (spec §1 Non-goals) — this module is pure
//! in-process analysis over snippets the caller already fetched.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

use regex::Regex;

/// Reply style learned for one sender address.
#[derive(Debug, Clone)]
pub struct SenderPattern {
    pub sender_email: String,
    pub reply_count: usize,
    pub typical_greeting: String,
    pub typical_signoff: String,
    pub tone: Tone,
    /// 0-100, `min(100, reply_count * 15)`.
    pub confidence: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Formal,
    Casual,
    Neutral,
}

const MAX_SNIPPETS_ANALYZED: usize = 20;

fn greeting_patterns() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        [r"^(Hi [A-Z][a-z]+,?)", r"^(Hello [A-Z][a-z]+,?)", r"^(Hey [A-Z][a-z]+,?)", r"^(Dear [A-Z][a-z]+,?)", r"^(Hi,)", r"^(Hello,)"]
            .iter()
            .map(|p| Regex::new(p).unwrap())
            .collect()
    })
}

fn signoff_patterns() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        [r"(?i)(Thanks,?)$", r"(?i)(Thank you,?)$", r"(?i)(Best,?)$", r"(?i)(Best regards,?)$", r"(?i)(Regards,?)$", r"(?i)(Cheers,?)$", r"(?i)(Sincerely,?)$"]
            .iter()
            .map(|p| Regex::new(p).unwrap())
            .collect()
    })
}

/// Builds a `SenderPattern` from up to 20 recent outbound snippets to
/// this address. Caller already resolved which emails went to whom.
pub fn analyze_sender_pattern(sender_email: &str, sent_snippets: &[String]) -> SenderPattern {
    let reply_count = sent_snippets.len();
    if reply_count == 0 {
        return SenderPattern {
            sender_email: sender_email.to_string(),
            reply_count: 0,
            typical_greeting: String::new(),
            typical_signoff: String::new(),
            tone: Tone::Neutral,
            confidence: 0,
        };
    }

    let mut greetings: HashMap<String, u32> = HashMap::new();
    let mut signoffs: HashMap<String, u32> = HashMap::new();
    let mut formal_indicators = 0u32;
    let mut casual_indicators = 0u32;

    for snippet in sent_snippets.iter().take(MAX_SNIPPETS_ANALYZED) {
        for pattern in greeting_patterns() {
            if let Some(m) = pattern.find(snippet) {
                let greeting = m.as_str().to_string();
                let lower = greeting.to_lowercase();
                if lower.starts_with("hey") {
                    casual_indicators += 1;
                } else if lower.starts_with("dear") {
                    formal_indicators += 1;
                }
                *greetings.entry(greeting).or_insert(0) += 1;
                break;
            }
        }

        for pattern in signoff_patterns() {
            if let Some(m) = pattern.find(snippet) {
                let signoff = m.as_str().to_string();
                let lower = signoff.to_lowercase();
                if lower.starts_with("cheers") {
                    casual_indicators += 1;
                } else if lower.starts_with("sincerely") {
                    formal_indicators += 1;
                }
                *signoffs.entry(signoff).or_insert(0) += 1;
                break;
            }
        }
    }

    let typical_greeting = greetings.into_iter().max_by_key(|(_, n)| *n).map(|(g, _)| g).unwrap_or_default();
    let typical_signoff = signoffs.into_iter().max_by_key(|(_, n)| *n).map(|(s, _)| s).unwrap_or_default();
    let tone = if formal_indicators > casual_indicators {
        Tone::Formal
    } else if casual_indicators > formal_indicators {
        Tone::Casual
    } else {
        Tone::Neutral
    };

    SenderPattern {
        sender_email: sender_email.to_string(),
        reply_count,
        typical_greeting,
        typical_signoff,
        tone,
        confidence: (reply_count as u32 * 15).min(100) as u8,
    }
}

const MIN_REPLIES_FOR_AUTO: usize = 3;
const AUTO_SEND_CONFIDENCE_THRESHOLD: u8 = 95;

/// Caches `analyze_sender_pattern` results for 24h per sender, mirroring
/// the cache-TTL idiom used for C4's nudge dedupe ledger.
pub struct SenderPatternCache {
    entries: Mutex<HashMap<String, (SenderPattern, Instant)>>,
}

const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

impl Default for SenderPatternCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SenderPatternCache {
    pub fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }

    /// Returns the cached pattern if still fresh, else re-analyzes
    /// `sent_snippets` and refreshes the cache.
    pub fn get_or_analyze(&self, sender_email: &str, sent_snippets: &[String]) -> SenderPattern {
        let mut entries = self.entries.lock().expect("sender pattern cache lock poisoned");
        if let Some((pattern, fetched_at)) = entries.get(sender_email) {
            if fetched_at.elapsed() < CACHE_TTL {
                return pattern.clone();
            }
        }
        let pattern = analyze_sender_pattern(sender_email, sent_snippets);
        entries.insert(sender_email.to_string(), (pattern.clone(), Instant::now()));
        pattern
    }
}

/// Suggested reply styling for one incoming email, derived from a
/// cached `SenderPattern`.
#[derive(Debug, Clone)]
pub struct ReplySuggestion {
    pub greeting: String,
    pub signoff: String,
    pub tone: Tone,
}

/// Advises whether an incoming message can be auto-replied to without a
/// human in the loop, and what the reply should sound like.
pub struct EmailAutoReplyAdvisor<'a> {
    cache: &'a SenderPatternCache,
}

impl<'a> EmailAutoReplyAdvisor<'a> {
    pub fn new(cache: &'a SenderPatternCache) -> Self {
        Self { cache }
    }

    pub fn suggest_reply(&self, sender_email: &str, sent_snippets: &[String]) -> ReplySuggestion {
        let pattern = self.cache.get_or_analyze(sender_email, sent_snippets);
        ReplySuggestion { greeting: pattern.typical_greeting, signoff: pattern.typical_signoff, tone: pattern.tone }
    }

    /// `(should_auto_reply, confidence, reason)`, mirroring
    /// `should_auto_reply`'s cascading checks.
    pub fn should_auto_reply(&self, sender_email: &str, sent_snippets: &[String], needs_response: bool) -> (bool, u8, String) {
        let pattern = self.cache.get_or_analyze(sender_email, sent_snippets);

        if pattern.reply_count < MIN_REPLIES_FOR_AUTO {
            return (false, pattern.confidence, format!("Insufficient history: {}/{MIN_REPLIES_FOR_AUTO} replies", pattern.reply_count));
        }
        if pattern.confidence < AUTO_SEND_CONFIDENCE_THRESHOLD {
            return (false, pattern.confidence, format!("Confidence too low: {}% < {AUTO_SEND_CONFIDENCE_THRESHOLD}%", pattern.confidence));
        }
        if needs_response {
            return (
                true,
                pattern.confidence,
                format!("Pattern established: {} replies, {}% confidence", pattern.reply_count, pattern.confidence),
            );
        }
        (false, pattern.confidence, "No response needed".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snippets(n: usize) -> Vec<String> {
        std::iter::repeat("Hi Sarah,\nSounds good, thanks for the update.\nBest,".to_string()).take(n).collect()
    }

    #[test]
    fn no_history_yields_zero_confidence() {
        let pattern = analyze_sender_pattern("nobody@example.com", &[]);
        assert_eq!(pattern.confidence, 0);
        assert_eq!(pattern.reply_count, 0);
    }

    #[test]
    fn confidence_scales_with_reply_count_and_caps_at_100() {
        let pattern = analyze_sender_pattern("sarah@example.com", &snippets(3));
        assert_eq!(pattern.confidence, 45);
        let pattern = analyze_sender_pattern("sarah@example.com", &snippets(10));
        assert_eq!(pattern.confidence, 100);
    }

    #[test]
    fn detects_greeting_and_signoff_and_formal_tone() {
        let pattern = analyze_sender_pattern("sarah@example.com", &snippets(5));
        assert_eq!(pattern.typical_greeting, "Hi Sarah,");
        assert_eq!(pattern.typical_signoff, "Best,");
        assert_eq!(pattern.tone, Tone::Neutral);
    }

    #[test]
    fn casual_greeting_and_signoff_tip_the_tone() {
        let casual = vec!["Hey Sam,\nCheers,".to_string(); 5];
        let pattern = analyze_sender_pattern("sam@example.com", &casual);
        assert_eq!(pattern.tone, Tone::Casual);
    }

    #[test]
    fn auto_reply_refused_below_minimum_history() {
        let cache = SenderPatternCache::new();
        let advisor = EmailAutoReplyAdvisor::new(&cache);
        let (should, _, reason) = advisor.should_auto_reply("sarah@example.com", &snippets(1), true);
        assert!(!should);
        assert!(reason.contains("Insufficient history"));
    }

    #[test]
    fn auto_reply_approved_once_pattern_established() {
        let cache = SenderPatternCache::new();
        let advisor = EmailAutoReplyAdvisor::new(&cache);
        let (should, confidence, reason) = advisor.should_auto_reply("sarah@example.com", &snippets(10), true);
        assert!(should);
        assert_eq!(confidence, 100);
        assert!(reason.contains("Pattern established"));
    }

    #[test]
    fn cache_returns_same_pattern_without_reanalysis() {
        let cache = SenderPatternCache::new();
        let first = cache.get_or_analyze("sarah@example.com", &snippets(3));
        let second = cache.get_or_analyze("sarah@example.com", &[]);
        assert_eq!(first.confidence, second.confidence);
    }
}
