//! Shared state the webhook handlers close over, mirroring
//! `secondbrain_telegram::context::TelegramContext`'s bundle of services.

use std::sync::Arc;

use secondbrain_entities::places::GeocodingProvider;
use secondbrain_kb::KnowledgeBase;
use secondbrain_processor::transcribe::Transcriber;
use secondbrain_processor::MessageProcessor;
use secondbrain_queue::OfflineQueue;
use secondbrain_timezone::TimeParser;

use crate::client::WhatsappClient;

#[derive(Clone)]
pub struct WhatsappContext {
    pub kb: Arc<KnowledgeBase>,
    pub parser: Arc<TimeParser>,
    pub geocoder: Arc<dyn GeocodingProvider + Send + Sync>,
    pub transcriber: Arc<dyn Transcriber + Send + Sync>,
    pub queue: Arc<OfflineQueue>,
    pub processor: Arc<MessageProcessor>,
    pub client: Arc<WhatsappClient>,
    pub verify_token: String,
    pub app_secret: String,
}
