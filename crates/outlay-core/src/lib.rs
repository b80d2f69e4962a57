//! outlay-core - Core library for Outlay
//!
//! This crate contains the expense models, the local cache, the remote
//! collection client, and the reconciler that keeps the two in agreement.
//! Every Outlay interface builds on it.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod models;
pub mod remote;
pub mod services;
pub mod state;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use identity::{IdentityContext, SessionIdentity, UserIdentity};
pub use models::{Category, ExpenseRecord, ListItem, LocalId, NewExpense, RemoteId};
pub use services::LocalStore;
pub use state::SyncState;
pub use sync::{Reconciler, SyncFacade, SyncPolicy};
