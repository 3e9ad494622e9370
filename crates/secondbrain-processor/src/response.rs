//! Deterministic response text for a processed message (spec §4.11):
//! `"Got it. <title>, <day-of-week> at <HH:MMam/pm> with <people>, at <place>,
//! for <project>."` — any fragment with nothing to fill is omitted along
//! with its leading separator rather than rendered as an empty slot.

use chrono::{DateTime, Datelike, Utc};
use secondbrain_timezone::TimeParser;

/// Everything `build_response` needs to know about the entity that was just
/// created, already resolved to display names.
#[derive(Debug, Default, Clone)]
pub struct ResponseContext {
    pub title: String,
    pub due_at: Option<String>,
    pub due_timezone: Option<String>,
    pub people: Vec<String>,
    pub place: Option<String>,
    pub project: Option<String>,
}

pub fn build_response(ctx: &ResponseContext, parser: &TimeParser) -> String {
    let mut out = format!("Got it. {}", ctx.title);

    if let Some(due_at) = &ctx.due_at {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(due_at) {
            let tz = ctx
                .due_timezone
                .as_deref()
                .and_then(|name| name.parse().ok())
                .unwrap_or_else(|| parser.default_timezone());
            let local = parsed.with_timezone(&Utc).with_timezone(&tz);
            let weekday = weekday_name(local.weekday());
            let time = parser.format_for_display(local, false);
            out.push_str(&format!(", {weekday} at {time}"));
        }
    }

    if !ctx.people.is_empty() {
        out.push_str(&format!(" with {}", ctx.people.join(", ")));
    }

    if let Some(place) = &ctx.place {
        out.push_str(&format!(", at {place}"));
    }

    if let Some(project) = &ctx.project {
        out.push_str(&format!(", for {project}"));
    }

    out.push('.');
    out
}

fn weekday_name(weekday: chrono::Weekday) -> &'static str {
    match weekday {
        chrono::Weekday::Mon => "Monday",
        chrono::Weekday::Tue => "Tuesday",
        chrono::Weekday::Wed => "Wednesday",
        chrono::Weekday::Thu => "Thursday",
        chrono::Weekday::Fri => "Friday",
        chrono::Weekday::Sat => "Saturday",
        chrono::Weekday::Sun => "Sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_title_has_no_trailing_fragments() {
        let parser = TimeParser::new("UTC");
        let ctx = ResponseContext { title: "Buy milk".to_string(), ..Default::default() };
        assert_eq!(build_response(&ctx, &parser), "Got it. Buy milk.");
    }

    #[test]
    fn full_context_renders_every_fragment() {
        let parser = TimeParser::new("UTC");
        let ctx = ResponseContext {
            title: "Lunch with Sarah".to_string(),
            due_at: Some("2024-01-15T14:00:00+00:00".to_string()),
            due_timezone: Some("UTC".to_string()),
            people: vec!["Sarah".to_string()],
            place: Some("Cafe Luna".to_string()),
            project: Some("Q1 planning".to_string()),
        };
        let text = build_response(&ctx, &parser);
        assert_eq!(text, "Got it. Lunch with Sarah, Monday at 2pm with Sarah, at Cafe Luna, for Q1 planning.");
    }

    #[test]
    fn missing_place_omits_its_fragment_and_separator() {
        let parser = TimeParser::new("UTC");
        let ctx = ResponseContext {
            title: "Call mom".to_string(),
            due_at: Some("2024-01-15T09:00:00+00:00".to_string()),
            due_timezone: Some("UTC".to_string()),
            ..Default::default()
        };
        let text = build_response(&ctx, &parser);
        assert_eq!(text, "Got it. Call mom, Monday at 9am.");
    }
}
