//! Wires every `secondbrain-*` service into one long-lived process: one
//! struct owns every collaborator, built once at startup.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use secondbrain_channels::{Channel, OutboundMessage};
use secondbrain_core::config::SecondBrainConfig;
use secondbrain_entities::places::GeocodingProvider;
use secondbrain_kb::KnowledgeBase;
use secondbrain_processor::transcribe::{NullTranscriber, Transcriber};
use secondbrain_processor::MessageProcessor;
use secondbrain_queue::OfflineQueue;
use secondbrain_scheduler::DedupeLedger;
use secondbrain_telegram::{TelegramAdapter, TelegramContext};
use secondbrain_timezone::TimeParser;
use secondbrain_whatsapp::{WhatsappAdapter, WhatsappClient, WhatsappContext};

use crate::geocoder::GoogleGeocoder;
use crate::transcriber::WhisperTranscriber;

/// Bind address for the WhatsApp webhook receiver. Not in the config
/// schema (spec.md §6 lists only transport credentials) — operators
/// front this with their own reverse proxy/TLS termination.
const WHATSAPP_WEBHOOK_BIND: &str = "0.0.0.0:8443";

pub struct Application {
    pub config: SecondBrainConfig,
    pub kb: Arc<KnowledgeBase>,
    pub parser: Arc<TimeParser>,
    pub processor: Arc<MessageProcessor>,
    pub queue: Arc<OfflineQueue>,
    pub geocoder: Arc<dyn GeocodingProvider + Send + Sync>,
    pub transcriber: Arc<dyn Transcriber + Send + Sync>,
}

impl Application {
    pub fn build(config: SecondBrainConfig) -> Result<Self> {
        let kb = Arc::new(KnowledgeBase::open(&config.database.path).context("opening knowledge base")?);
        let parser = Arc::new(TimeParser::new(&config.personalization.user_timezone));
        let queue = Arc::new(OfflineQueue::in_data_dir(&config.personalization.data_dir));
        let processor = Arc::new(MessageProcessor::new());

        let geocoder: Arc<dyn GeocodingProvider + Send + Sync> = match &config.google.maps_api_key {
            Some(key) if !key.is_empty() => Arc::new(GoogleGeocoder::new(key.clone())),
            _ => Arc::new(NoopGeocoder),
        };

        let transcriber: Arc<dyn Transcriber + Send + Sync> = match &config.providers.speech_to_text_api_key {
            Some(key) if !key.is_empty() => Arc::new(WhisperTranscriber::new(key.clone())),
            _ => Arc::new(NullTranscriber),
        };

        let refreshed = processor.refresh_patterns(&kb).context("loading pattern cache")?;
        info!(patterns = refreshed, "loaded applicable pattern cache");

        Ok(Self { config, kb, parser, processor, queue, geocoder, transcriber })
    }

    fn telegram_context(&self) -> Arc<TelegramContext> {
        Arc::new(TelegramContext {
            kb: Arc::clone(&self.kb),
            parser: Arc::clone(&self.parser),
            geocoder: Arc::clone(&self.geocoder),
            transcriber: Arc::clone(&self.transcriber),
            queue: Arc::clone(&self.queue),
            processor: Arc::clone(&self.processor),
            expected_chat_id: self.config.personalization.user_transport_chat_id.clone(),
        })
    }

    fn whatsapp_context(&self) -> Arc<WhatsappContext> {
        let whatsapp_cfg = self.config.channels.whatsapp.as_ref().expect("whatsapp configured");
        Arc::new(WhatsappContext {
            kb: Arc::clone(&self.kb),
            parser: Arc::clone(&self.parser),
            geocoder: Arc::clone(&self.geocoder),
            transcriber: Arc::clone(&self.transcriber),
            queue: Arc::clone(&self.queue),
            processor: Arc::clone(&self.processor),
            client: Arc::new(WhatsappClient::new(whatsapp_cfg)),
            verify_token: whatsapp_cfg.verify_token.clone(),
            app_secret: whatsapp_cfg.app_secret.clone(),
        })
    }

    /// Builds the single outbound channel proactive messages (nudges,
    /// briefings) go through. Telegram is preferred when both transports
    /// are configured, since `user_transport_chat_id` names one chat.
    async fn outbound_channel(&self) -> Result<Box<dyn Channel + Send + Sync>> {
        if let Some(telegram_cfg) = &self.config.channels.telegram {
            let mut adapter = TelegramAdapter::new(telegram_cfg.bot_token.clone(), self.telegram_context());
            adapter.connect().await.map_err(|e| anyhow::anyhow!(e.to_string()))?;
            return Ok(Box::new(adapter));
        }
        if self.config.channels.whatsapp.is_some() {
            let mut adapter = WhatsappAdapter::new(WhatsappClient::new(self.config.channels.whatsapp.as_ref().unwrap()));
            adapter.connect().await.map_err(|e| anyhow::anyhow!(e.to_string()))?;
            return Ok(Box::new(adapter));
        }
        bail!("no transport configured (channels.telegram / channels.whatsapp)")
    }

    async fn send_proactive(&self, text: &str) -> Result<()> {
        let Some(chat_id) = self.config.personalization.user_transport_chat_id.clone() else {
            bail!("personalization.user_transport_chat_id is not configured");
        };
        let channel = self.outbound_channel().await?;
        let channel_name = channel.name().to_string();
        channel
            .send(&OutboundMessage::plain(channel_name, chat_id, text))
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))
    }

    /// `run` — start every configured transport plus the nudge engine and
    /// briefing loop, and block until shutdown (spec §6 CLI surface).
    pub async fn run(self) -> Result<()> {
        let app = Arc::new(self);
        let mut handles = Vec::new();

        if let Some(telegram_cfg) = app.config.channels.telegram.clone() {
            let ctx = app.telegram_context();
            handles.push(tokio::spawn(async move {
                let mut adapter = TelegramAdapter::new(telegram_cfg.bot_token, ctx);
                adapter.run().await;
            }));
        }

        if app.config.channels.whatsapp.is_some() {
            let ctx = app.whatsapp_context();
            let bind = WHATSAPP_WEBHOOK_BIND.to_string();
            handles.push(tokio::spawn(async move {
                let router = secondbrain_whatsapp::router(ctx);
                match tokio::net::TcpListener::bind(&bind).await {
                    Ok(listener) => {
                        info!(%bind, "whatsapp webhook listening");
                        if let Err(err) = axum::serve(listener, router).await {
                            warn!(%err, "whatsapp webhook server exited");
                        }
                    }
                    Err(err) => warn!(%err, %bind, "failed to bind whatsapp webhook listener"),
                }
            }));
        }

        {
            let app = Arc::clone(&app);
            handles.push(tokio::spawn(async move {
                loop {
                    if let Err(err) = app.nudge_once().await {
                        warn!(%err, "nudge pass failed");
                    }
                    tokio::time::sleep(std::time::Duration::from_secs(60)).await;
                }
            }));
        }

        {
            let app = Arc::clone(&app);
            handles.push(tokio::spawn(async move {
                loop {
                    if let Err(err) = app.briefing_once().await {
                        warn!(%err, "briefing pass failed");
                    }
                    tokio::time::sleep(std::time::Duration::from_secs(60)).await;
                }
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }

        Ok(())
    }

    /// `check` — config parseable (already true by the time this runs) and
    /// knowledge base reachable.
    pub fn check(&self) -> Result<()> {
        self.kb.list_tasks(None, false).context("knowledge base not reachable")?;
        Ok(())
    }

    /// `briefing` — one morning-briefing pass, sent only if due and not
    /// already sent today (idempotency key `briefing:<date>:<chat>`).
    pub async fn briefing_once(&self) -> Result<bool> {
        let Some(chat_id) = self.config.personalization.user_transport_chat_id.clone() else {
            bail!("personalization.user_transport_chat_id is not configured");
        };
        let now = chrono::Utc::now();
        let body = secondbrain_briefing::morning::maybe_generate(
            &self.kb,
            &self.parser,
            self.processor.audit(),
            &chat_id,
            self.config.personalization.morning_briefing_hour,
            now,
        )?;

        match body {
            Some(text) => {
                self.send_proactive(&text).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// `nudge` — one scan/dispatch pass of the nudge engine.
    pub async fn nudge_once(&self) -> Result<bool> {
        let ledger = DedupeLedger::in_data_dir(&self.config.personalization.data_dir)?;
        let mut engine = secondbrain_scheduler::NudgeEngine::new(&self.kb, &self.parser, self.processor.audit(), ledger);
        let dispatches = engine.tick(chrono::Utc::now())?;

        if dispatches.is_empty() {
            return Ok(false);
        }

        for dispatch in dispatches {
            if let Err(err) = self.send_proactive(&dispatch.message).await {
                warn!(%err, task_id = %dispatch.task.id, "failed to deliver nudge");
            }
        }

        Ok(true)
    }

    /// `drain-queue` — replay the offline queue against the knowledge base.
    pub fn drain_queue(&self) -> Result<bool> {
        let result = self.queue.process_queue(&self.kb);
        info!(total = result.total_processed, successful = result.successful, failed = result.failed, deduplicated = result.deduplicated, "offline queue drained");
        for error in &result.errors {
            warn!(%error, "offline queue entry failed");
        }
        Ok(result.all_successful())
    }
}

/// Used when no `google.maps_api_key` is configured: every lookup reports
/// failure rather than the process refusing to start. Matches spec.md's
/// "Maps client not configured" fallback in the original `PlacesService.enrich`.
struct NoopGeocoder;

impl GeocodingProvider for NoopGeocoder {
    fn enrich(&self, _query: &str) -> secondbrain_entities::error::Result<secondbrain_entities::places::EnrichmentResult> {
        Ok(secondbrain_entities::places::EnrichmentResult { success: false, error: Some("Maps client not configured".to_string()), ..Default::default() })
    }
}
