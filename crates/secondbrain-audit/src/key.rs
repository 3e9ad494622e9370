/// Builds the colon-joined idempotency keys described in spec §4.9/§6.
///
/// `telegram:<chat>:<msg>` for transports, `calendar:<task-id>:<yyyy-mm-dd>`
/// for calendar events, `briefing:<yyyy-mm-dd>:<chat>` for briefings.
pub struct IdempotencyKey;

impl IdempotencyKey {
    pub fn transport(transport_prefix: &str, chat_id: &str, message_id: &str) -> String {
        format!("{transport_prefix}:{chat_id}:{message_id}")
    }

    pub fn calendar(task_id: &str, yyyy_mm_dd: &str) -> String {
        format!("calendar:{task_id}:{yyyy_mm_dd}")
    }

    pub fn briefing(yyyy_mm_dd: &str, chat_id: &str) -> String {
        format!("briefing:{yyyy_mm_dd}:{chat_id}")
    }

    pub fn undo(chat_id: &str, message_id: &str) -> String {
        format!("undo:{chat_id}:{message_id}")
    }

    pub fn correction(chat_id: &str, message_id: &str) -> String {
        format!("correction:{chat_id}:{message_id}")
    }

    pub fn nudge(task_id: &str, nudge_type: &str, yyyy_mm_dd: &str) -> String {
        format!("nudge:{task_id}:{nudge_type}:{yyyy_mm_dd}")
    }

    /// Prefixes an existing key for the dedupe-marker entry (spec §4.9
    /// `log_deduplicated`).
    pub fn dedupe_marker(original_key: &str) -> String {
        format!("dedupe:{original_key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_key_shape() {
        assert_eq!(IdempotencyKey::transport("telegram", "123", "456"), "telegram:123:456");
    }

    #[test]
    fn calendar_key_shape() {
        assert_eq!(IdempotencyKey::calendar("T1", "2024-01-15"), "calendar:T1:2024-01-15");
    }

    #[test]
    fn dedupe_marker_prefixes_original() {
        assert_eq!(IdempotencyKey::dedupe_marker("telegram:1:2"), "dedupe:telegram:1:2");
    }
}
