//! Database-specific error types and conversions.

use shajara_core::error::ShajaraError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Row decode failed: {0}")]
    Decode(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl From<DbError> for ShajaraError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ShajaraError::NotFound { entity, id },
            DbError::Transaction(msg) => ShajaraError::Transaction(msg),
            other => ShajaraError::Database(other.to_string()),
        }
    }
}
