use std::io;

use outlay_core::LocalId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] outlay_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("Expense title cannot be empty")]
    EmptyTitle,
    #[error("Invalid amount '{0}': expected a non-negative number")]
    InvalidAmount(String),
    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("{0}")]
    InvalidCategory(String),
    #[error("Expense not found: {0}")]
    ExpenseNotFound(LocalId),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("Sync failed; see the log above for details")]
    SyncFailed,
    #[error(
        "Sync is not configured. Run `outlay config init` + `outlay auth login` to mirror expenses to Firebase."
    )]
    SyncNotConfigured,
}
