//! Error types for reportq.

use crate::model::job::JobStatus;
use crate::storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid report request: {}", fields.join(", "))]
    Validation { fields: Vec<String> },

    #[error("invalid report job id {0}")]
    InvalidId(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("report not ready (status: {status})")]
    NotReady { status: JobStatus },

    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("generation failed: {0}")]
    Generation(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a validation error for a single field.
    pub fn invalid(field: impl Into<String>) -> Self {
        Self::Validation {
            fields: vec![field.into()],
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
