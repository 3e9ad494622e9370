//! WhatsApp transport adapter (C14 concrete transport), grounded on
//! `assistant.whatsapp.webhook`/`assistant.whatsapp.client` and
//! an axum-based webhook ingress. Inbound messages arrive over the
//! Cloud API webhook (axum routes in [`webhook`]); outbound sends
//! (replies, proactive nudges, briefings) go through [`adapter::WhatsappAdapter`]
//! implementing `secondbrain_channels::Channel`.

pub mod adapter;
pub mod client;
pub mod context;
pub mod error;
pub mod payload;
pub mod verify;
pub mod webhook;

pub use adapter::WhatsappAdapter;
pub use client::WhatsappClient;
pub use context::WhatsappContext;
pub use error::WhatsappError;
pub use webhook::router;
