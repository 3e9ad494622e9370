use thiserror::Error;

/// Errors produced by the WhatsApp webhook and client.
#[derive(Debug, Error)]
pub enum WhatsappError {
    #[error("webhook verification failed: {0}")]
    Verification(String),

    #[error("invalid webhook payload: {0}")]
    Parse(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("whatsapp api error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error(transparent)]
    Processor(#[from] secondbrain_processor::error::ProcessorError),
}
