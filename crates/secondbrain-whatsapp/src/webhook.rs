//! Axum routes for the WhatsApp Cloud API webhook: GET for Meta's
//! subscription handshake, POST for message delivery. Uses the fixed
//! WhatsApp verification/signature contract rather than a per-source
//! configurable one.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::warn;

use secondbrain_core::types::Source;
use secondbrain_processor::Envelope;

use crate::context::WhatsappContext;
use crate::payload::{extract_messages, InboundKind};
use crate::verify;

pub fn router(ctx: Arc<WhatsappContext>) -> Router {
    Router::new().route("/webhook", get(handle_verify).post(handle_message)).with_state(ctx)
}

async fn handle_verify(State(ctx): State<Arc<WhatsappContext>>, Query(params): Query<HashMap<String, String>>) -> Response {
    let result = verify::verify_handshake(
        params.get("hub.mode").map(String::as_str),
        params.get("hub.verify_token").map(String::as_str),
        params.get("hub.challenge").map(String::as_str),
        &ctx.verify_token,
    );

    match result {
        Ok(challenge) => challenge.into_response(),
        Err(err) => {
            warn!(%err, "whatsapp webhook verification failed");
            (StatusCode::FORBIDDEN, "verification failed").into_response()
        }
    }
}

async fn handle_message(State(ctx): State<Arc<WhatsappContext>>, headers: HeaderMap, body: Bytes) -> Response {
    let signature = headers.get("x-hub-signature-256").and_then(|v| v.to_str().ok());
    if !verify::verify_signature(&body, signature, &ctx.app_secret) {
        warn!("whatsapp webhook: signature verification failed");
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "invalid signature"}))).into_response();
    }

    let parsed: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(err) => {
            warn!(%err, "whatsapp webhook: invalid JSON body");
            return (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid JSON body"}))).into_response();
        }
    };

    for message in extract_messages(&parsed) {
        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            handle_inbound(ctx, message).await;
        });
    }

    (StatusCode::OK, Json(json!({"ok": true}))).into_response()
}

async fn handle_inbound(ctx: Arc<WhatsappContext>, message: crate::payload::InboundWhatsappMessage) {
    let (text, source) = match message.kind {
        InboundKind::Text(text) => (text, Source::WhatsappText),
        InboundKind::Audio { media_id } => match ctx.client.download_media(&media_id).await {
            Ok(audio) => {
                let transcriber = Arc::clone(&ctx.transcriber);
                let transcribed = tokio::task::spawn_blocking(move || transcriber.transcribe(&audio)).await;
                match transcribed.unwrap_or_else(|_| Ok(String::new())) {
                    Ok(text) if !text.is_empty() => (text, Source::WhatsappVoice),
                    Ok(_) => {
                        send_reply(&ctx, &message.from_number, "Voice transcription isn't configured yet — try typing that one.").await;
                        return;
                    }
                    Err(err) => {
                        warn!(%err, "whatsapp: transcription failed");
                        send_reply(&ctx, &message.from_number, "Couldn't transcribe that voice message, try again.").await;
                        return;
                    }
                }
            }
            Err(err) => {
                warn!(%err, "whatsapp: failed to download voice media");
                return;
            }
        },
        InboundKind::Location { .. } | InboundKind::Unsupported => return,
    };

    if text.trim().is_empty() {
        return;
    }

    let envelope = Envelope { text, chat_id: message.from_number.clone(), message_id: message.message_id, source };

    let ctx2 = Arc::clone(&ctx);
    let reply = tokio::task::spawn_blocking(move || ctx2.processor.process(&ctx2.kb, &ctx2.parser, ctx2.geocoder.as_ref(), &ctx2.queue, &envelope)).await;

    let reply_text = match reply {
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

    send_reply(&ctx, &message.from_number, &reply_text).await;
}

async fn send_reply(ctx: &WhatsappContext, to: &str, text: &str) {
    if let Err(err) = ctx.client.send_text(to, text).await {
        warn!(%err, "whatsapp: failed to send reply");
    }
}
