use thiserror::Error;

#[derive(Debug, Error)]
pub enum KbError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, KbError>;

impl From<KbError> for secondbrain_core::Error {
    fn from(e: KbError) -> Self {
        match e {
            KbError::Database(err) => secondbrain_core::Error::Database(err.to_string()),
            KbError::NotFound { entity, id } => secondbrain_core::Error::NotFound {
                entity: entity.to_string(),
                id,
            },
            KbError::Serialization(err) => secondbrain_core::Error::Serialization(err),
        }
    }
}
