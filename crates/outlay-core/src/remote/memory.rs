//! In-memory remote store for tests and offline demos.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{ExpenseDocument, RemoteError, RemoteResult, RemoteStore};
use crate::identity::UserIdentity;
use crate::models::RemoteId;

type Collection = BTreeMap<RemoteId, ExpenseDocument>;

/// Remote store keeping every user's collection in process memory.
///
/// Failure switches make individual operations fail with
/// [`RemoteError::Unreachable`], and call counters record every attempt,
/// including failed ones.
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    collections: Mutex<BTreeMap<String, Collection>>,
    next_id: AtomicU64,
    fail_fetch: AtomicBool,
    fail_create: AtomicBool,
    fail_update: AtomicBool,
    fail_delete: AtomicBool,
    fetch_calls: AtomicUsize,
    create_calls: AtomicUsize,
    update_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl MemoryRemoteStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a document directly into a user's collection.
    pub fn seed(&self, user_id: &str, remote_id: RemoteId, document: ExpenseDocument) {
        self.lock()
            .entry(user_id.to_string())
            .or_default()
            .insert(remote_id.clone(), document.with_id(&remote_id));
    }

    /// Documents currently stored for a user, ordered by id.
    pub fn documents(&self, user_id: &str) -> Vec<(RemoteId, ExpenseDocument)> {
        self.lock()
            .get(user_id)
            .map(|collection| {
                collection
                    .iter()
                    .map(|(id, document)| (id.clone(), document.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn document_count(&self, user_id: &str) -> usize {
        self.lock().get(user_id).map_or(0, BTreeMap::len)
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_update(&self, fail: bool) {
        self.fail_update.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    /// Make every operation fail, as if the network were down.
    pub fn set_offline(&self, offline: bool) {
        self.set_fail_fetch(offline);
        self.set_fail_create(offline);
        self.set_fail_update(offline);
        self.set_fail_delete(offline);
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Collection>> {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn check(flag: &AtomicBool, operation: &str) -> RemoteResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(RemoteError::Unreachable(format!(
                "simulated network failure during {operation}"
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn fetch_all(
        &self,
        user: &UserIdentity,
    ) -> RemoteResult<Vec<(RemoteId, ExpenseDocument)>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_fetch, "fetch")?;
        Ok(self.documents(user.user_id()))
    }

    async fn create(
        &self,
        user: &UserIdentity,
        document: &ExpenseDocument,
    ) -> RemoteResult<RemoteId> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_create, "create")?;

        let sequence = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let remote_id = RemoteId::new(format!("doc-{sequence:04}"));
        self.lock()
            .entry(user.user_id().to_string())
            .or_default()
            .insert(remote_id.clone(), document.clone().with_id(&remote_id));
        Ok(remote_id)
    }

    async fn update(
        &self,
        user: &UserIdentity,
        remote_id: &RemoteId,
        document: &ExpenseDocument,
    ) -> RemoteResult<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_update, "update")?;

        let mut collections = self.lock();
        let stored = collections
            .get_mut(user.user_id())
            .and_then(|collection| collection.get_mut(remote_id))
            .ok_or_else(|| RemoteError::NotFound(remote_id.to_string()))?;
        *stored = document.clone().with_id(remote_id);
        Ok(())
    }

    async fn delete_by_id(&self, user: &UserIdentity, remote_id: &RemoteId) -> RemoteResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_delete, "delete")?;

        if let Some(collection) = self.lock().get_mut(user.user_id()) {
            collection.remove(remote_id);
        }
        Ok(())
    }
}
