use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error(transparent)]
    Kb(#[from] secondbrain_kb::KbError),
    #[error(transparent)]
    Entities(#[from] secondbrain_entities::error::EntitiesError),
    #[error("offline queue io error: {0}")]
    Queue(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProcessorError>;

impl From<ProcessorError> for secondbrain_core::Error {
    fn from(e: ProcessorError) -> Self {
        match e {
            ProcessorError::Kb(err) => err.into(),
            ProcessorError::Entities(err) => err.into(),
            ProcessorError::Queue(err) => err.into(),
        }
    }
}
