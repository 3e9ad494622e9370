use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("authentication failed: {0}")]
    AuthFailed(String),
    #[error("timed out after {ms}ms")]
    Timeout { ms: u64 },
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl From<&ChannelError> for secondbrain_core::ErrorKind {
    fn from(err: &ChannelError) -> Self {
        match err {
            ChannelError::ConnectionFailed(_) | ChannelError::Timeout { .. } => secondbrain_core::ErrorKind::TransientExternal,
            ChannelError::SendFailed(_) => secondbrain_core::ErrorKind::TransientExternal,
            ChannelError::AuthFailed(_) => secondbrain_core::ErrorKind::PermanentExternal,
            ChannelError::ConfigError(_) => secondbrain_core::ErrorKind::ConfigError,
        }
    }
}
