use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Kb(#[from] secondbrain_kb::KbError),
    #[error("dedupe ledger io error: {0}")]
    Ledger(#[from] std::io::Error),
    #[error("dedupe ledger is corrupt: {0}")]
    LedgerFormat(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
