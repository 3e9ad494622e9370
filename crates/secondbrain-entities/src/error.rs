use thiserror::Error;

#[derive(Debug, Error)]
pub enum EntitiesError {
    #[error(transparent)]
    Kb(#[from] secondbrain_kb::KbError),
}

pub type Result<T> = std::result::Result<T, EntitiesError>;

impl From<EntitiesError> for secondbrain_core::Error {
    fn from(e: EntitiesError) -> Self {
        match e {
            EntitiesError::Kb(err) => err.into(),
        }
    }
}
