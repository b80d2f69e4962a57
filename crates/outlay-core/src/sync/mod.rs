//! Reconciliation between the local cache and the remote collection.

mod facade;
mod policy;
mod reconciler;

#[cfg(test)]
mod tests;

pub use facade::SyncFacade;
pub use policy::{EditMode, SyncPolicy};
pub use reconciler::{Reconciler, RemoveOutcome, ResyncOutcome, UpsertOutcome};
