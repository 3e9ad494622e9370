use thiserror::Error;

#[derive(Debug, Error)]
pub enum BriefingError {
    #[error(transparent)]
    Kb(#[from] secondbrain_kb::KbError),
}

pub type Result<T> = std::result::Result<T, BriefingError>;
