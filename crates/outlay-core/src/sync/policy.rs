use serde::{Deserialize, Serialize};

/// How an online edit of an already-synced record reaches the remote store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditMode {
    /// Overwrite the linked remote document.
    #[default]
    UpdateInPlace,
    /// Create a fresh remote document on every upsert, leaving the old one behind.
    AlwaysCreate,
}

/// Reconciler behaviour switches.
///
/// The defaults are the hardened behaviour. [`SyncPolicy::legacy`] restores
/// the unguarded baseline: duplicate documents on edit, no offline fallback
/// and no write serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncPolicy {
    pub edit_mode: EditMode,
    /// Keep failed authenticated upserts locally, flagged `pending_sync`.
    pub offline_fallback: bool,
    /// Run every mutating operation under a single writer lock.
    pub serialize_writes: bool,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            edit_mode: EditMode::UpdateInPlace,
            offline_fallback: true,
            serialize_writes: true,
        }
    }
}

impl SyncPolicy {
    #[must_use]
    pub const fn legacy() -> Self {
        Self {
            edit_mode: EditMode::AlwaysCreate,
            offline_fallback: false,
            serialize_writes: false,
        }
    }
}
