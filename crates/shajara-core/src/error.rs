//! Error types for the Shajara system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShajaraError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Transaction aborted: {0}")]
    Transaction(String),

    #[error("Mail delivery failed: {0}")]
    Mail(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ShajaraResult<T> = Result<T, ShajaraError>;
