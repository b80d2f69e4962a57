//! Shared cross-client state types.

/// Sync status published by the reconciler for status indicators.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncState {
    /// No authenticated user; only local operations run.
    #[default]
    Offline,
    Syncing,
    Synced,
    Error,
}
