//! `Channel` implementation for WhatsApp, so the scheduler and morning
//! briefing can push proactive messages through the same trait every other
//! transport uses. Inbound delivery is handled separately by the axum
//! routes in [`crate::webhook`]; this only covers outbound send + status.

use std::sync::Mutex;

use async_trait::async_trait;

use secondbrain_channels::{Channel, ChannelError, ChannelStatus, OutboundMessage};

use crate::client::WhatsappClient;

pub struct WhatsappAdapter {
    client: WhatsappClient,
    status: Mutex<ChannelStatus>,
}

impl WhatsappAdapter {
    pub fn new(client: WhatsappClient) -> Self {
        Self { client, status: Mutex::new(ChannelStatus::Disconnected) }
    }
}

#[async_trait]
impl Channel for WhatsappAdapter {
    fn name(&self) -> &str {
        "whatsapp"
    }

    async fn connect(&mut self) -> Result<(), ChannelError> {
        *self.status.lock().expect("status lock poisoned") = ChannelStatus::Connected;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), ChannelError> {
        *self.status.lock().expect("status lock poisoned") = ChannelStatus::Disconnected;
        Ok(())
    }

    async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError> {
        self.client.send_text(&msg.recipient_id, &msg.content).await.map_err(|e| ChannelError::SendFailed(e.to_string()))
    }

    fn status(&self) -> ChannelStatus {
        self.status.lock().expect("status lock poisoned").clone()
    }
}
