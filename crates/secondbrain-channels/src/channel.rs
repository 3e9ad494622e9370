use async_trait::async_trait;

use crate::error::ChannelError;
use crate::types::{ChannelStatus, OutboundMessage};

/// A transport a message can arrive on and be sent back out through
/// (spec §4.14). Implemented once per transport (`secondbrain-telegram`,
/// `secondbrain-whatsapp`); the inbound side delivers `InboundMessage`s
/// through whatever channel-specific plumbing the adapter wires up (a
/// teloxide dispatcher, an axum webhook handler) rather than through this
/// trait, which only models the outbound/lifecycle surface a
/// `ChannelManager` needs to be generic over.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;
    async fn connect(&mut self) -> Result<(), ChannelError>;
    async fn disconnect(&mut self) -> Result<(), ChannelError>;
    async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError>;
    fn status(&self) -> ChannelStatus;
}
