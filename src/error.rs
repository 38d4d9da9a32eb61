use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown {entity} `{id}`")]
    InvalidReference { entity: &'static str, id: String },

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("record store operation failed")]
    Store(#[from] sqlx::Error),

    #[error("schema migration failed")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("csv serialization failed")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub fn invalid_reference(entity: &'static str, id: impl Into<String>) -> Self {
        Error::InvalidReference {
            entity,
            id: id.into(),
        }
    }

    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Error::Validation {
            field,
            reason: reason.into(),
        }
    }
}
