//! Transport-neutral channel abstraction (C14): the `Channel` trait, the
//! inbound/outbound message envelope, and a reconnect-managing registry.
//! Concrete transports live in `secondbrain-telegram`/`secondbrain-whatsapp`.

pub mod channel;
pub mod error;
pub mod listener;
pub mod manager;
pub mod types;

pub use channel::Channel;
pub use error::ChannelError;
pub use listener::{AlwaysOnListener, ListenerState, NoopListener};
pub use manager::ChannelManager;
pub use types::{ChannelStatus, InboundMessage, MessageFormat, OutboundMessage};
