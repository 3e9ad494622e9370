//! Telegram message handler registered in the teloxide Dispatcher.
//!
//! Bot filter, text/caption extraction, non-blocking dispatch, built for a
//! single-chat personal-assistant model: no allowlist, no mention-gating,
//! no slash-command router — just the one configured chat
//! feeding `MessageProcessor::process`.

use std::sync::Arc;

use teloxide::net::Download;
use teloxide::prelude::*;
use tracing::warn;

use secondbrain_core::types::Source;
use secondbrain_processor::Envelope;

use crate::context::TelegramContext;
use crate::send;

/// Runs for every incoming `Message`. Ignores messages from other bots,
/// from chats other than the configured one, and anything with neither
/// text, caption, nor voice content.
pub async fn handle_message(bot: Bot, msg: Message, ctx: Arc<TelegramContext>) -> ResponseResult<()> {
    if msg.from.as_ref().map(|u| u.is_bot).unwrap_or(false) {
        return Ok(());
    }

    let chat_id = msg.chat.id.0.to_string();
    if !ctx.accepts(&chat_id) {
        return Ok(());
    }

    let message_id = msg.id.0.to_string();

    let (text, source) = if let Some(voice) = msg.voice() {
        let file = match bot.get_file(&voice.file.id).await {
            Ok(f) => f,
            Err(err) => {
                warn!(%err, "telegram: failed to resolve voice file");
                return Ok(());
            }
        };
        let mut audio = Vec::new();
        if let Err(err) = bot.download_file(&file.path, &mut audio).await {
            warn!(%err, "telegram: failed to download voice file");
            return Ok(());
        }
        let transcriber = Arc::clone(&ctx.transcriber);
        let transcribed = tokio::task::spawn_blocking(move || transcriber.transcribe(&audio)).await;
        match transcribed.unwrap_or_else(|_| Ok(String::new())) {
            Ok(text) if !text.is_empty() => (text, Source::TelegramVoice),
            Ok(_) => {
                send::send_response(&bot, msg.chat.id, "Voice transcription isn't configured yet — try typing that one.").await;
                return Ok(());
            }
            Err(err) => {
                warn!(%err, "telegram: transcription failed");
                send::send_response(&bot, msg.chat.id, "Couldn't transcribe that voice message, try again.").await;
                return Ok(());
            }
        }
    } else {
        let text = msg.text().or(msg.caption()).unwrap_or("").to_string();
        (text, Source::TelegramText)
    };

    if text.trim().is_empty() {
        return Ok(());
    }

    let envelope = Envelope { text, chat_id, message_id, source };

    let bot2 = bot.clone();
    let chat = msg.chat.id;
    let ctx2 = Arc::clone(&ctx);

    tokio::spawn(async move {
        let reply = tokio::task::spawn_blocking(move || ctx2.processor.process(&ctx2.kb, &ctx2.parser, ctx2.geocoder.as_ref(), &ctx2.queue, &envelope)).await;

        let text = match reply {
            Ok(Ok(text)) => text,
            Ok(Err(err)) => {
                warn!(%err, "message processor failed");
                "Sorry, something went wrong processing that.".to_string()
            }
            Err(err) => {
                warn!(%err, "message processor task panicked");
                "Sorry, something went wrong processing that.".to_string()
            }
        };

        send::send_response(&bot2, chat, &text).await;
    });

    Ok(())
}
