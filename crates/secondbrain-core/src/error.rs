use thiserror::Error;

/// The broad recovery-policy bucket a concrete error falls into (spec §7).
///
/// Orchestrators (the message processor, the scheduler) branch on this
/// instead of matching individual error variants, so a new leaf error only
/// needs to pick a kind to get the right retry/offline-queue/user-message
/// behavior for free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Timeouts, 5xx, network resets. Retried up to 3 times with backoff,
    /// then routed to the offline queue if the call was a KB write.
    TransientExternal,
    /// 4xx (except 404), permission denied, bad payload. Logged at ERROR,
    /// surfaced to the user with a short generic message.
    PermanentExternal,
    /// 404. Treated as success for deletes, as "not found" for lookups.
    NotFound,
    /// Ill-formed user input. Responded to with a clarification prompt.
    ValidationError,
    /// A broken internal invariant. Logged with full context, never shown
    /// to the user verbatim.
    InternalInvariantViolation,
    /// Configuration is missing or malformed. Surfaces at startup / `check`.
    ConfigError,
}

impl ErrorKind {
    /// Whether the orchestrator should retry the call that produced this
    /// error before giving up.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::TransientExternal)
    }
}

/// Top-level error type shared by every `secondbrain-*` crate.
///
/// Leaf crates (kb, queue, ...) define their own `thiserror` enums for their
/// internal failure modes and convert into this one at their public API
/// boundary.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("external service {service} error: {message}")]
    ExternalTransient { service: String, message: String },

    #[error("external service {service} rejected request: {message}")]
    ExternalPermanent { service: String, message: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: String },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("internal invariant violated: {0}")]
    Internal(String),

    #[error("operation timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) => ErrorKind::ConfigError,
            Error::Database(_) => ErrorKind::TransientExternal,
            Error::ExternalTransient { .. } => ErrorKind::TransientExternal,
            Error::ExternalPermanent { .. } => ErrorKind::PermanentExternal,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Validation(_) => ErrorKind::ValidationError,
            Error::Internal(_) => ErrorKind::InternalInvariantViolation,
            Error::Timeout { .. } => ErrorKind::TransientExternal,
            Error::Serialization(_) => ErrorKind::InternalInvariantViolation,
            Error::Io(_) => ErrorKind::TransientExternal,
        }
    }

    /// Stable short code for logging and client-facing error payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config(_) => "CONFIG_ERROR",
            Error::Database(_) => "DATABASE_ERROR",
            Error::ExternalTransient { .. } => "EXTERNAL_TRANSIENT",
            Error::ExternalPermanent { .. } => "EXTERNAL_PERMANENT",
            Error::NotFound { .. } => "NOT_FOUND",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::Internal(_) => "INTERNAL_ERROR",
            Error::Timeout { .. } => "TIMEOUT",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
            Error::Io(_) => "IO_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
