use thiserror::Error;

/// Errors produced by the Telegram adapter.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("teloxide error: {0}")]
    Teloxide(#[from] teloxide::RequestError),

    #[error("no bot token configured")]
    NoToken,

    #[error(transparent)]
    Processor(#[from] secondbrain_processor::error::ProcessorError),
}
