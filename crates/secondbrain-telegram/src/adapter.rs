//! Telegram channel adapter.
//!
//! Wraps a teloxide `Bot` + `Dispatcher` and drives the long-polling event
//! loop until the process exits. Implements `Channel` so a
//! `ChannelManager`/the scheduler/briefing generator can push proactive
//! messages (nudges, morning briefings) the same way any other transport
//! does, while `run()` separately drives inbound dispatch.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use teloxide::prelude::*;
use tracing::info;

use secondbrain_channels::{Channel, ChannelError, ChannelStatus, OutboundMessage};

use crate::context::TelegramContext;
use crate::handler::handle_message;
use crate::send;

pub struct TelegramAdapter {
    bot_token: String,
    bot: Option<Bot>,
    ctx: Arc<TelegramContext>,
    status: Mutex<ChannelStatus>,
}

impl TelegramAdapter {
    pub fn new(bot_token: impl Into<String>, ctx: Arc<TelegramContext>) -> Self {
        Self { bot_token: bot_token.into(), bot: None, ctx, status: Mutex::new(ChannelStatus::Disconnected) }
    }

    /// Connects and drives the long-polling dispatcher. Never returns
    /// under normal operation — runs for the lifetime of the process.
    pub async fn run(&mut self) {
        let bot = self.bot.clone().unwrap_or_else(|| Bot::new(&self.bot_token));
        info!("Telegram: starting long-polling dispatcher");

        let ctx = Arc::clone(&self.ctx);
        let handler = Update::filter_message().endpoint(handle_message);

        Dispatcher::builder(bot, handler)
            .dependencies(dptree::deps![ctx])
            .default_handler(|_upd| async {})
            .build()
            .dispatch()
            .await;
    }
}

#[async_trait]
impl Channel for TelegramAdapter {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn connect(&mut self) -> Result<(), ChannelError> {
        let bot = Bot::new(&self.bot_token);
        bot.get_me().await.map_err(|e| ChannelError::AuthFailed(e.to_string()))?;
        self.bot = Some(bot);
        *self.status.lock().expect("status lock poisoned") = ChannelStatus::Connected;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), ChannelError> {
        self.bot = None;
        *self.status.lock().expect("status lock poisoned") = ChannelStatus::Disconnected;
        Ok(())
    }

    async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError> {
        let bot = self.bot.as_ref().ok_or_else(|| ChannelError::SendFailed("not connected".to_string()))?;
        let chat_id: i64 = msg.recipient_id.parse().map_err(|_| ChannelError::SendFailed(format!("invalid telegram chat id: {}", msg.recipient_id)))?;
        send::send_response(bot, ChatId(chat_id), &msg.content).await;
        Ok(())
    }

    fn status(&self) -> ChannelStatus {
        self.status.lock().expect("status lock poisoned").clone()
    }
}
