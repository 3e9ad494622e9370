//! Shared state the Telegram dispatcher hands to every message handler
//! invocation: the bundle of `secondbrain-*` services a single-chat
//! personal-assistant orchestrator needs.

use std::sync::Arc;

use secondbrain_entities::places::GeocodingProvider;
use secondbrain_kb::KnowledgeBase;
use secondbrain_processor::transcribe::Transcriber;
use secondbrain_processor::MessageProcessor;
use secondbrain_queue::OfflineQueue;
use secondbrain_timezone::TimeParser;

#[derive(Clone)]
pub struct TelegramContext {
    pub kb: Arc<KnowledgeBase>,
    pub parser: Arc<TimeParser>,
    pub geocoder: Arc<dyn GeocodingProvider + Send + Sync>,
    pub transcriber: Arc<dyn Transcriber + Send + Sync>,
    pub queue: Arc<OfflineQueue>,
    pub processor: Arc<MessageProcessor>,
    /// The single chat this personal assistant replies to
    /// (`user_transport_chat_id`, spec §6). Messages from any other chat
    /// are ignored — there is no multi-tenant allowlist in this spec.
    pub expected_chat_id: Option<String>,
}

impl TelegramContext {
    pub fn accepts(&self, chat_id: &str) -> bool {
        match &self.expected_chat_id {
            Some(expected) => expected == chat_id,
            None => true,
        }
    }
}
