//! Error types for outlay-core

use thiserror::Error;

use crate::remote::RemoteError;

/// Result type alias using outlay-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in outlay-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote document store error
    #[error("Remote store error: {0}")]
    Remote(#[from] RemoteError),
}
