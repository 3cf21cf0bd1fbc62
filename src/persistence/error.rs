//! Error types for the persistence layer.

use thiserror::Error;

/// Errors that can occur while reading or writing persisted state.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The requested state blob does not exist.
    #[error("State not found")]
    NotFound,

    /// An error occurred while interacting with the database.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A state blob could not be encoded or decoded.
    #[error("State serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database migrations failed to run.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}
