//! Per-user remote expense collection.
//!
//! Every operation is scoped by a [`UserIdentity`], so a store can only reach
//! the collection of the user it is called for.

mod document;
mod firestore;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::identity::UserIdentity;
use crate::models::RemoteId;

pub use document::ExpenseDocument;
pub use firestore::{FirestoreConfig, FirestoreRemoteStore};
pub use memory::MemoryRemoteStore;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Remote store unreachable: {0}")]
    Unreachable(String),
    #[error("Remote store rejected the request: {message} ({status})")]
    Rejected { status: u16, message: String },
    #[error("Remote document not found: {0}")]
    NotFound(String),
    #[error("Invalid remote payload: {0}")]
    InvalidPayload(String),
    #[error("Invalid remote store configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::InvalidPayload(error.to_string())
        } else {
            Self::Unreachable(error.to_string())
        }
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Document collection holding each user's expenses.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Full snapshot of the user's collection; all or nothing.
    async fn fetch_all(&self, user: &UserIdentity)
        -> RemoteResult<Vec<(RemoteId, ExpenseDocument)>>;

    /// Store `document` under a newly generated id and return that id.
    async fn create(&self, user: &UserIdentity, document: &ExpenseDocument)
        -> RemoteResult<RemoteId>;

    /// Overwrite the document stored under `remote_id`.
    async fn update(
        &self,
        user: &UserIdentity,
        remote_id: &RemoteId,
        document: &ExpenseDocument,
    ) -> RemoteResult<()>;

    /// Remove the document stored under `remote_id`.
    async fn delete_by_id(&self, user: &UserIdentity, remote_id: &RemoteId) -> RemoteResult<()>;
}
