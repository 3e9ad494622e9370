use serde::{Deserialize, Serialize};

/// A proactive outbound message fired by the scheduler/briefing subsystem,
/// on its way to a transport adapter. Carries the nudge/briefing dedupe key
/// alongside the rendered text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProactiveDelivery {
    /// Logical channel name this should be sent on (e.g. "telegram").
    pub channel: String,
    /// Platform-native chat/recipient id.
    pub chat_id: String,
    pub message: String,
    /// The idempotency/dedupe key this delivery corresponds to, so the
    /// caller can mark-sent only after a successful send.
    pub dedupe_key: String,
}
