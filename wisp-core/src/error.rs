use thiserror::Error;

#[derive(Error, Debug)]
pub enum WispError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Other error: {0}")]
    Other(String),
}

/// Failures surfaced by the record store gateway and its backends.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The connection was never established; the process stays degraded.
    #[error("Storage unavailable: database connection is not initialized")]
    Unavailable,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Backend error: {0}")]
    Backend(String),
}
