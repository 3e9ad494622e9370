//! Time & Timezone subsystem (C1).
//!
//! Parses natural-language time fragments ("tomorrow 2pm", "9am EST",
//! "in 2 hours") into timezone-aware instants, and formats instants back
//! for display. No module-level singleton: a `TimeParser` is constructed
//! once (with the user's configured default timezone) and held by whichever
//! orchestrator needs it.
//!
//! Grounded on `examples/original_source/src/assistant/services/timezone.py`
//! (`TimezoneService`), reimplemented on `chrono`/`chrono-tz` instead of
//! Python's `zoneinfo`.

use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimezoneError {
    #[error("unknown IANA timezone: {0}")]
    UnknownZone(String),
}

pub type Result<T> = std::result::Result<T, TimezoneError>;

/// Closed set of timezone abbreviations recognised as an explicit trailing
/// marker (spec §4.1), mapped to their IANA name. Order matches the
/// original Python `TIMEZONE_ABBREVIATIONS` dict.
const TIMEZONE_ABBREVIATIONS: &[(&str, &str)] = &[
    ("EST", "America/New_York"),
    ("EDT", "America/New_York"),
    ("CST", "America/Chicago"),
    ("CDT", "America/Chicago"),
    ("MST", "America/Denver"),
    ("MDT", "America/Denver"),
    ("PST", "America/Los_Angeles"),
    ("PDT", "America/Los_Angeles"),
    ("AKST", "America/Anchorage"),
    ("AKDT", "America/Anchorage"),
    ("HST", "Pacific/Honolulu"),
    ("GMT", "Europe/London"),
    ("BST", "Europe/London"),
    ("CET", "Europe/Paris"),
    ("CEST", "Europe/Paris"),
    ("EET", "Europe/Helsinki"),
    ("EEST", "Europe/Helsinki"),
    ("UTC", "UTC"),
    ("IST", "Asia/Kolkata"),
    ("JST", "Asia/Tokyo"),
    ("AEST", "Australia/Sydney"),
    ("AEDT", "Australia/Sydney"),
];

/// Result of spotting an explicit timezone abbreviation in text.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTimezone {
    pub tz: Tz,
    pub original_text: String,
    pub confidence: u8,
}

/// Result of parsing a natural-language time fragment.
#[derive(Debug, Clone)]
pub struct ParsedInstant {
    pub instant: DateTime<Tz>,
    pub confidence: u8,
    /// The matched text fragment, for diagnostics/logging.
    pub original_text: String,
    pub is_relative: bool,
}

fn abbrev_to_tz(abbrev: &str) -> Option<Tz> {
    let upper = abbrev.to_uppercase();
    TIMEZONE_ABBREVIATIONS
        .iter()
        .find(|(a, _)| *a == upper)
        .and_then(|(_, iana)| Tz::from_str(iana).ok())
}

/// Parses and formats natural-language time fragments against a configured
/// default timezone (spec §4.1).
#[derive(Debug, Clone)]
pub struct TimeParser {
    default_tz: Tz,
}

impl TimeParser {
    /// `default_timezone` is the IANA name from config (`user_timezone`).
    /// Falls back to UTC if the name is not recognised, mirroring the
    /// Python original's `except KeyError: fallback to UTC`.
    pub fn new(default_timezone: &str) -> Self {
        let default_tz = Tz::from_str(default_timezone).unwrap_or(Tz::UTC);
        Self { default_tz }
    }

    pub fn default_timezone(&self) -> Tz {
        self.default_tz
    }

    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.default_tz)
    }

    pub fn today_midnight(&self) -> DateTime<Tz> {
        let now = self.now();
        self.default_tz
            .with_ymd_and_hms(now.year(), now.month(), now.day(), 0, 0, 0)
            .single()
            .unwrap_or(now)
    }

    /// Extract an explicit trailing timezone abbreviation from text, if any
    /// (spec §4.1: "Explicit trailing abbreviation overrides user default").
    pub fn parse_explicit_timezone(&self, text: &str) -> Option<ParsedTimezone> {
        let lower = text.to_lowercase();
        for (abbrev, iana) in TIMEZONE_ABBREVIATIONS {
            let needle = abbrev.to_lowercase();
            if word_boundary_contains(&lower, &needle) {
                if let Ok(tz) = Tz::from_str(iana) {
                    return Some(ParsedTimezone {
                        tz,
                        original_text: abbrev.to_string(),
                        confidence: 95,
                    });
                }
            }
        }
        None
    }

    /// Parse a supported time fragment, resolving relative to `now`
    /// (caller's current instant in UTC; tests fix this for determinism).
    ///
    /// Supported: `today`, `tomorrow`, weekday names,
    /// `in N {minute|hour|day|week}(s)`, `H[:MM][am|pm]` with optional
    /// trailing timezone abbreviation.
    pub fn parse(&self, text: &str, now_utc: DateTime<Utc>) -> Option<ParsedInstant> {
        let lower = text.to_lowercase();

        let explicit_tz = self.parse_explicit_timezone(&lower);
        let tz = explicit_tz.as_ref().map(|p| p.tz).unwrap_or(self.default_tz);
        let now = now_utc.with_timezone(&tz);

        if word_boundary_contains(&lower, "tomorrow") {
            let base = now + Duration::days(1);
            let (h, m) = extract_time(&lower).unwrap_or((9, 0));
            let dt = base
                .with_hour(h)
                .and_then(|d| d.with_minute(m))
                .and_then(|d| d.with_second(0))
                .unwrap_or(base);
            return Some(ParsedInstant {
                instant: dt,
                confidence: 95,
                original_text: "tomorrow".to_string(),
                is_relative: true,
            });
        }

        if word_boundary_contains(&lower, "today") {
            let (h, m) = extract_time(&lower).unwrap_or((now.hour(), now.minute()));
            let dt = now
                .with_hour(h)
                .and_then(|d| d.with_minute(m))
                .and_then(|d| d.with_second(0))
                .unwrap_or(now);
            return Some(ParsedInstant {
                instant: dt,
                confidence: 95,
                original_text: "today".to_string(),
                is_relative: true,
            });
        }

        for (name, weekday) in WEEKDAYS {
            if word_boundary_contains(&lower, name) {
                let (h, m) = extract_time(&lower).unwrap_or((9, 0));
                let mut days_ahead =
                    weekday.num_days_from_monday() as i64 - now.weekday().num_days_from_monday() as i64;
                if days_ahead < 0 {
                    days_ahead += 7;
                } else if days_ahead == 0 && (h, m) <= (now.hour(), now.minute()) {
                    // Today matches the named weekday but the time has already
                    // passed: roll to next week's occurrence instead.
                    days_ahead += 7;
                }
                let base = now + Duration::days(days_ahead);
                let dt = base
                    .with_hour(h)
                    .and_then(|d| d.with_minute(m))
                    .and_then(|d| d.with_second(0))
                    .unwrap_or(base);
                return Some(ParsedInstant {
                    instant: dt,
                    confidence: 90,
                    original_text: name.to_string(),
                    is_relative: true,
                });
            }
        }

        if let Some((amount, unit)) = extract_relative_offset(&lower) {
            let dt = match unit {
                "minute" => now + Duration::minutes(amount),
                "hour" => now + Duration::hours(amount),
                "day" => now + Duration::days(amount),
                "week" => now + Duration::weeks(amount),
                _ => now,
            };
            return Some(ParsedInstant {
                instant: dt,
                confidence: 90,
                original_text: format!("in {amount} {unit}(s)"),
                is_relative: true,
            });
        }

        // Bare `H[am|pm]` with no date: resolves to today; if already past,
        // moves to tomorrow (spec §4.1).
        if let Some((h, m)) = extract_time(&lower) {
            let mut dt = now
                .with_hour(h)
                .and_then(|d| d.with_minute(m))
                .and_then(|d| d.with_second(0))
                .unwrap_or(now);
            if dt < now {
                dt += Duration::days(1);
            }
            return Some(ParsedInstant {
                instant: dt,
                confidence: 75,
                original_text: format!("{h}:{m:02}"),
                is_relative: false,
            });
        }

        None
    }

    /// Format an instant for user display: `"2pm"`, optionally with a
    /// trailing timezone abbreviation-ish suffix (spec §4.1).
    pub fn format_for_display(&self, dt: DateTime<Tz>, include_timezone: bool) -> String {
        let hour = dt.hour();
        let minute = dt.minute();

        let (display_hour, ampm) = match hour {
            0 => (12, "am"),
            h if h < 12 => (h, "am"),
            12 => (12, "pm"),
            h => (h - 12, "pm"),
        };

        let mut result = if minute > 0 {
            format!("{display_hour}:{minute:02}{ampm}")
        } else {
            format!("{display_hour}{ampm}")
        };

        if include_timezone {
            result.push(' ');
            result.push_str(&dt.format("%Z").to_string());
        }

        result
    }

    /// ISO-8601 with offset; UTC renders with a trailing `Z` (spec §4.1).
    pub fn to_iso8601(&self, dt: DateTime<Tz>) -> String {
        if dt.offset().to_string() == "+00:00" || dt.timezone() == Tz::UTC {
            dt.with_timezone(&Utc).to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
        } else {
            dt.to_rfc3339()
        }
    }
}

const WEEKDAYS: &[(&str, Weekday)] = &[
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

fn word_boundary_contains(haystack: &str, needle: &str) -> bool {
    // Cheap word-boundary check sufficient for our closed vocabularies
    // (weekday/month/abbreviation lists) without pulling in `regex` here.
    haystack
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word == needle)
}

/// Extract `(hour, minute)` in 24h format from text like `"3:30pm"` or
/// `"3pm"`. Returns `None` if nothing matches.
fn extract_time(text: &str) -> Option<(u32, u32)> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            let hour_str = &text[start..i];
            let mut minute = 0u32;
            let mut j = i;
            if j < bytes.len() && (bytes[j] == b':' || bytes[j] == b'.') {
                let sep = j;
                j += 1;
                let mstart = j;
                while j < bytes.len() && bytes[j].is_ascii_digit() {
                    j += 1;
                }
                if j > mstart {
                    minute = text[mstart..j].parse().unwrap_or(0);
                } else {
                    j = sep;
                }
            }
            // Optional whitespace then am/pm.
            let mut k = j;
            while k < bytes.len() && bytes[k] == b' ' {
                k += 1;
            }
            let ampm = if text[k..].starts_with("am") {
                Some("am")
            } else if text[k..].starts_with("pm") {
                Some("pm")
            } else {
                None
            };

            if let Ok(mut hour) = hour_str.parse::<u32>() {
                if hour > 24 {
                    i += 1;
                    continue;
                }
                if let Some(ap) = ampm {
                    if ap == "pm" && hour < 12 {
                        hour += 12;
                    } else if ap == "am" && hour == 12 {
                        hour = 0;
                    }
                    return Some((hour, minute));
                } else if j > i {
                    // "3:30" with no am/pm but a minute component present —
                    // still a plausible time fragment.
                    return Some((hour, minute));
                }
            }
        }
        i += 1;
    }
    None
}

/// Extract `(amount, unit)` from `"in N {minute|hour|day|week}(s)"`.
fn extract_relative_offset(text: &str) -> Option<(i64, &'static str)> {
    let idx = text.find("in ")?;
    let rest = &text[idx + 3..];
    let mut chars = rest.char_indices();
    let digit_start = chars.find(|(_, c)| c.is_ascii_digit())?.0;
    if digit_start != 0 {
        return None;
    }
    let digit_end = rest
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    let amount: i64 = rest[..digit_end].parse().ok()?;
    let remainder = rest[digit_end..].trim_start();
    for (unit, label) in [
        ("minute", "minute"),
        ("hour", "hour"),
        ("day", "day"),
        ("week", "week"),
    ] {
        if remainder.starts_with(unit) {
            return Some((amount, label));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fixed_now() -> DateTime<Utc> {
        // 2024-01-14 18:00 UTC == 2024-01-14 10:00 PST.
        Utc.from_utc_datetime(&NaiveDate::from_ymd_opt(2024, 1, 14).unwrap().and_hms_opt(18, 0, 0).unwrap())
    }

    #[test]
    fn tomorrow_2pm_in_pacific() {
        let parser = TimeParser::new("America/Los_Angeles");
        let parsed = parser.parse("tomorrow 2pm", fixed_now()).expect("should parse");
        assert_eq!(parsed.instant.hour(), 14);
        assert_eq!(parsed.instant.day(), 15);
    }

    #[test]
    fn explicit_abbreviation_overrides_default() {
        let parser = TimeParser::new("UTC");
        let tz = parser.parse_explicit_timezone("9am EST").unwrap();
        assert_eq!(tz.original_text, "EST");
        assert_eq!(tz.tz, Tz::from_str("America/New_York").unwrap());
    }

    #[test]
    fn bare_time_in_past_rolls_to_tomorrow() {
        let parser = TimeParser::new("UTC");
        // fixed_now is 18:00 UTC; asking for 9am should roll to tomorrow.
        let parsed = parser.parse("9am", fixed_now()).unwrap();
        assert_eq!(parsed.instant.day(), 15);
        assert_eq!(parsed.instant.hour(), 9);
    }

    #[test]
    fn weekday_resolves_to_next_occurrence() {
        let parser = TimeParser::new("UTC");
        // fixed_now is a Sunday (2024-01-14).
        let parsed = parser.parse("monday", fixed_now()).unwrap();
        assert_eq!(parsed.instant.weekday(), Weekday::Mon);
        assert!(parsed.instant > fixed_now().with_timezone(&Tz::UTC));
    }

    #[test]
    fn relative_offset_in_two_hours() {
        let parser = TimeParser::new("UTC");
        let parsed = parser.parse("in 2 hours", fixed_now()).unwrap();
        assert_eq!(parsed.instant.hour(), 20);
    }

    #[test]
    fn unparseable_returns_none() {
        let parser = TimeParser::new("UTC");
        assert!(parser.parse("just some words", fixed_now()).is_none());
    }

    #[test]
    fn format_for_display_pm() {
        let parser = TimeParser::new("UTC");
        let dt = Tz::UTC.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap();
        assert_eq!(parser.format_for_display(dt, false), "2pm");
    }
}
