//! Keeps the local cache and the remote collection in agreement.

use std::sync::Arc;

use tokio::sync::{watch, Mutex, MutexGuard};

use super::policy::{EditMode, SyncPolicy};
use crate::identity::{IdentityContext, UserIdentity};
use crate::models::{ExpenseRecord, LocalId, RemoteId};
use crate::remote::{ExpenseDocument, RemoteError, RemoteResult, RemoteStore};
use crate::services::LocalStore;
use crate::state::SyncState;
use crate::Result;

/// Result of [`Reconciler::resync`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncOutcome {
    /// No signed-in user; nothing was fetched or changed.
    Skipped,
    /// The local cache now holds exactly `count` remote records.
    Replaced { count: usize },
}

/// Result of [`Reconciler::upsert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// Stored locally without touching the remote store.
    LocalOnly { local_id: LocalId },
    /// Stored remotely and locally, linked by `remote_id`.
    Synced { local_id: LocalId, remote_id: RemoteId },
    /// The remote write failed; kept locally and flagged for a later push.
    PendingSync { local_id: LocalId },
}

impl UpsertOutcome {
    #[must_use]
    pub const fn local_id(&self) -> LocalId {
        match self {
            Self::LocalOnly { local_id }
            | Self::Synced { local_id, .. }
            | Self::PendingSync { local_id } => *local_id,
        }
    }
}

/// Result of [`Reconciler::remove`]. The local row is gone in every case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// Remote cleanup not attempted: signed out or never synced.
    LocalOnly,
    RemoteDeleted,
    /// The remote document may still exist.
    RemoteFailed { reason: String },
}

/// Coordinates the local cache with the remote collection of the current user.
pub struct Reconciler {
    local: LocalStore,
    remote: Arc<dyn RemoteStore>,
    identity: Arc<dyn IdentityContext>,
    policy: SyncPolicy,
    writer: Mutex<()>,
    state: watch::Sender<SyncState>,
}

impl Reconciler {
    pub fn new(
        local: LocalStore,
        remote: Arc<dyn RemoteStore>,
        identity: Arc<dyn IdentityContext>,
    ) -> Self {
        let (state, _) = watch::channel(SyncState::default());

        Self {
            local,
            remote,
            identity,
            policy: SyncPolicy::default(),
            writer: Mutex::new(()),
            state,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: SyncPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub const fn policy(&self) -> SyncPolicy {
        self.policy
    }

    pub const fn local(&self) -> &LocalStore {
        &self.local
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    /// Replace the local cache with the remote snapshot of the current user.
    ///
    /// A failed fetch leaves the cache untouched. Records that were never
    /// synced are discarded by a successful resync; records flagged
    /// `pending_sync` are pushed first when offline fallback is enabled.
    pub async fn resync(&self) -> Result<ResyncOutcome> {
        let _writer = self.writer_guard().await;

        let Some(user) = self.identity.current_user() else {
            tracing::info!("Skipping resync: no signed-in user");
            self.publish_state(SyncState::Offline);
            return Ok(ResyncOutcome::Skipped);
        };

        self.publish_state(SyncState::Syncing);

        if self.policy.offline_fallback {
            if let Err(error) = self.push_pending_for(&user).await {
                tracing::warn!("Resync aborted, pending expenses could not be pushed: {error}");
                self.publish_state(SyncState::Error);
                return Err(error);
            }
        }

        let snapshot = match self.remote.fetch_all(&user).await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                tracing::warn!("Resync fetch failed for {}: {error}", user.user_id());
                self.publish_state(SyncState::Error);
                return Err(error.into());
            }
        };

        let records: Vec<ExpenseRecord> = snapshot
            .into_iter()
            .map(|(remote_id, document)| document.into_record(remote_id))
            .collect();
        let count = records.len();

        if let Err(error) = self.local.replace_all(&records).await {
            self.publish_state(SyncState::Error);
            return Err(error);
        }

        tracing::info!("Resynced {count} expenses for {}", user.user_id());
        self.publish_state(SyncState::Synced);
        Ok(ResyncOutcome::Replaced { count })
    }

    /// Store a new or edited record, remotely too when a user is signed in.
    pub async fn upsert(&self, record: ExpenseRecord) -> Result<UpsertOutcome> {
        let _writer = self.writer_guard().await;
        self.upsert_unguarded(record).await
    }

    /// Delete a record locally, then its remote document when one exists.
    ///
    /// Remote failures are reported in the outcome, never as an error.
    pub async fn remove(&self, record: &ExpenseRecord) -> Result<RemoveOutcome> {
        let _writer = self.writer_guard().await;

        self.local.delete(record).await?;

        let Some(remote_id) = record.remote_id.as_ref() else {
            return Ok(RemoveOutcome::LocalOnly);
        };
        // A stale copy may carry an id from before the last resync
        if let Some(linked) = self.local.find_by_remote_id(remote_id).await? {
            self.local.delete(&linked).await?;
        }

        let Some(user) = self.identity.current_user() else {
            tracing::debug!("Signed out; leaving remote expense {remote_id} in place");
            return Ok(RemoveOutcome::LocalOnly);
        };

        match self.remote.delete_by_id(&user, remote_id).await {
            Ok(()) => Ok(RemoveOutcome::RemoteDeleted),
            Err(error) => {
                tracing::warn!("Failed to delete remote expense {remote_id}: {error}");
                Ok(RemoveOutcome::RemoteFailed {
                    reason: error.to_string(),
                })
            }
        }
    }

    /// Push every `pending_sync` record and return how many were pushed.
    ///
    /// Stops at the first remote failure; already pushed records stay synced.
    pub async fn push_pending(&self) -> Result<usize> {
        let _writer = self.writer_guard().await;

        let Some(user) = self.identity.current_user() else {
            tracing::debug!("Skipping pending push: no signed-in user");
            return Ok(0);
        };

        self.publish_state(SyncState::Syncing);
        match self.push_pending_for(&user).await {
            Ok(pushed) => {
                self.publish_state(SyncState::Synced);
                Ok(pushed)
            }
            Err(error) => {
                self.publish_state(SyncState::Error);
                Err(error)
            }
        }
    }

    async fn upsert_unguarded(&self, mut record: ExpenseRecord) -> Result<UpsertOutcome> {
        record.local_id = self.resolve_local_id(&record).await?;

        let Some(user) = self.identity.current_user() else {
            let local_id = self.local.insert(&record).await?;
            return Ok(UpsertOutcome::LocalOnly { local_id });
        };

        match self.push_record(&user, &record).await {
            Ok(remote_id) => {
                record.remote_id = Some(remote_id.clone());
                record.pending_sync = false;

                let local_id = self.local.insert(&record).await?;
                Ok(UpsertOutcome::Synced {
                    local_id,
                    remote_id,
                })
            }
            Err(error) if self.policy.offline_fallback => {
                tracing::warn!(
                    "Remote write for '{}' failed, keeping it for a later push: {error}",
                    record.title
                );
                record.pending_sync = true;
                let local_id = self.local.insert(&record).await?;
                Ok(UpsertOutcome::PendingSync { local_id })
            }
            Err(error) => {
                tracing::warn!("Remote write for '{}' failed: {error}", record.title);
                Err(error.into())
            }
        }
    }

    /// Row that currently holds this record.
    ///
    /// The row linked to the record's remote id wins over the caller's local
    /// id, which may predate a resync. A local id whose row is gone yields
    /// `None` so the record gets a fresh row instead of reviving the dead id.
    async fn resolve_local_id(&self, record: &ExpenseRecord) -> Result<Option<LocalId>> {
        if let Some(remote_id) = record.remote_id.as_ref() {
            if let Some(linked) = self.local.find_by_remote_id(remote_id).await? {
                return Ok(linked.local_id);
            }
        }

        match record.local_id {
            Some(local_id) => Ok(self
                .local
                .get(local_id)
                .await?
                .and_then(|existing| existing.local_id)),
            None => Ok(None),
        }
    }

    /// Write one record to the remote store and return the id it lives under.
    async fn push_record(
        &self,
        user: &UserIdentity,
        record: &ExpenseRecord,
    ) -> RemoteResult<RemoteId> {
        let document = ExpenseDocument::from_record(record);

        if let (Some(remote_id), EditMode::UpdateInPlace) =
            (record.remote_id.as_ref(), self.policy.edit_mode)
        {
            match self.remote.update(user, remote_id, &document).await {
                Ok(()) => return Ok(remote_id.clone()),
                Err(RemoteError::NotFound(_)) => {
                    tracing::info!("Remote expense {remote_id} is gone, creating a new document");
                }
                Err(error) => return Err(error),
            }
        }

        self.remote.create(user, &document).await
    }

    async fn push_pending_for(&self, user: &UserIdentity) -> Result<usize> {
        let pending = self.local.list_pending().await?;
        if pending.is_empty() {
            return Ok(0);
        }

        tracing::info!("Pushing {} pending expenses", pending.len());
        let mut pushed = 0;
        for mut record in pending {
            let remote_id = self.push_record(user, &record).await?;
            record.remote_id = Some(remote_id);
            record.pending_sync = false;
            self.local.insert(&record).await?;
            pushed += 1;
        }
        Ok(pushed)
    }

    async fn writer_guard(&self) -> Option<MutexGuard<'_, ()>> {
        if self.policy.serialize_writes {
            Some(self.writer.lock().await)
        } else {
            None
        }
    }

    fn publish_state(&self, state: SyncState) {
        self.state.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }
}
