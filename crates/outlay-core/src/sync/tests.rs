use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tokio::sync::Notify;
use tokio::time::timeout;

use super::*;
use crate::identity::{IdentityContext, SessionIdentity, UserIdentity};
use crate::models::{ExpenseRecord, RemoteId};
use crate::remote::{ExpenseDocument, MemoryRemoteStore, RemoteResult, RemoteStore};
use crate::services::LocalStore;
use crate::state::SyncState;

const USER: &str = "user-1";

struct Harness {
    local: LocalStore,
    remote: Arc<MemoryRemoteStore>,
    identity: SessionIdentity,
    reconciler: Arc<Reconciler>,
}

async fn harness(signed_in: bool, policy: SyncPolicy) -> Harness {
    let local = LocalStore::open_in_memory().await.unwrap();
    let remote = Arc::new(MemoryRemoteStore::new());
    let identity = if signed_in {
        SessionIdentity::signed_in(UserIdentity::new(USER))
    } else {
        SessionIdentity::signed_out()
    };
    let reconciler = Reconciler::new(
        local.clone(),
        remote.clone(),
        Arc::new(identity.clone()),
    )
    .with_policy(policy);

    Harness {
        local,
        remote,
        identity,
        reconciler: Arc::new(reconciler),
    }
}

fn coffee() -> ExpenseRecord {
    ExpenseRecord::new("Coffee", 4.5, 1_700_000_000_000, "Food")
}

fn document(title: &str, date: i64) -> ExpenseDocument {
    ExpenseDocument {
        id: String::new(),
        title: title.to_string(),
        amount: 10.0,
        date,
        category: "Other".to_string(),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn signed_out_upsert_stays_local() {
    let h = harness(false, SyncPolicy::default()).await;

    let outcome = h.reconciler.upsert(coffee()).await.unwrap();

    assert!(matches!(outcome, UpsertOutcome::LocalOnly { .. }));
    let live = h.local.snapshot();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].remote_id, None);
    assert_eq!(live[0].local_id, Some(outcome.local_id()));
    assert_eq!(h.remote.create_calls(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn signed_in_upsert_links_created_document() {
    let h = harness(true, SyncPolicy::default()).await;

    let outcome = h.reconciler.upsert(coffee()).await.unwrap();

    let UpsertOutcome::Synced { local_id, remote_id } = outcome else {
        panic!("expected a synced outcome, got {outcome:?}");
    };
    let stored = h.local.get(local_id).await.unwrap().unwrap();
    assert_eq!(stored.remote_id, Some(remote_id.clone()));
    assert!(!stored.pending_sync);

    let documents = h.remote.documents(USER);
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].0, remote_id);
    assert_eq!(documents[0].1.id, remote_id.as_str());
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_fetch_leaves_cache_unchanged() {
    let h = harness(true, SyncPolicy::default()).await;
    h.reconciler.upsert(coffee()).await.unwrap();
    h.identity.sign_out();
    h.reconciler.upsert(coffee()).await.unwrap();
    h.identity.sign_in(UserIdentity::new(USER));
    let before = h.local.list().await.unwrap();

    h.remote.set_fail_fetch(true);
    let result = h.reconciler.resync().await;

    assert!(result.is_err());
    assert_eq!(h.local.list().await.unwrap(), before);
    assert_eq!(h.reconciler.state(), SyncState::Error);
}

#[tokio::test(flavor = "multi_thread")]
async fn resync_mirrors_remote_snapshot() {
    let h = harness(true, SyncPolicy::default()).await;
    for (index, id) in ["a1", "b2", "c3"].into_iter().enumerate() {
        h.remote
            .seed(USER, RemoteId::new(id), document(id, i64::try_from(index).unwrap()));
    }
    h.identity.sign_out();
    h.reconciler.upsert(coffee()).await.unwrap();
    h.identity.sign_in(UserIdentity::new(USER));

    let outcome = h.reconciler.resync().await.unwrap();

    assert_eq!(outcome, ResyncOutcome::Replaced { count: 3 });
    let mut remote_ids: Vec<String> = h
        .local
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|record| record.remote_id.unwrap().to_string())
        .collect();
    remote_ids.sort();
    assert_eq!(remote_ids, vec!["a1", "b2", "c3"]);
    assert_eq!(h.reconciler.state(), SyncState::Synced);
}

#[tokio::test(flavor = "multi_thread")]
async fn signed_out_resync_is_skipped() {
    let h = harness(false, SyncPolicy::default()).await;
    h.reconciler.upsert(coffee()).await.unwrap();

    let outcome = h.reconciler.resync().await.unwrap();

    assert_eq!(outcome, ResyncOutcome::Skipped);
    assert_eq!(h.remote.fetch_calls(), 0);
    assert_eq!(h.local.snapshot().len(), 1);
    assert_eq!(h.reconciler.state(), SyncState::Offline);
}

#[tokio::test(flavor = "multi_thread")]
async fn remove_always_deletes_local_row() {
    let h = harness(true, SyncPolicy::default()).await;
    let outcome = h.reconciler.upsert(coffee()).await.unwrap();
    let record = h.local.get(outcome.local_id()).await.unwrap().unwrap();

    h.remote.set_fail_delete(true);
    let removed = h.reconciler.remove(&record).await.unwrap();

    assert!(matches!(removed, RemoveOutcome::RemoteFailed { .. }));
    assert!(h.local.snapshot().is_empty());
    assert_eq!(h.remote.document_count(USER), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn remove_deletes_remote_document_when_synced() {
    let h = harness(true, SyncPolicy::default()).await;
    let outcome = h.reconciler.upsert(coffee()).await.unwrap();
    let record = h.local.get(outcome.local_id()).await.unwrap().unwrap();

    let removed = h.reconciler.remove(&record).await.unwrap();

    assert_eq!(removed, RemoveOutcome::RemoteDeleted);
    assert_eq!(h.remote.document_count(USER), 0);
    assert!(h.local.snapshot().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn remove_of_unsynced_record_never_calls_remote() {
    let h = harness(false, SyncPolicy::default()).await;
    let outcome = h.reconciler.upsert(coffee()).await.unwrap();
    let record = h.local.get(outcome.local_id()).await.unwrap().unwrap();
    h.identity.sign_in(UserIdentity::new(USER));

    let removed = h.reconciler.remove(&record).await.unwrap();

    assert_eq!(removed, RemoveOutcome::LocalOnly);
    assert_eq!(h.remote.delete_calls(), 0);
    assert!(h.local.snapshot().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn signed_out_remove_skips_remote() {
    let h = harness(true, SyncPolicy::default()).await;
    let outcome = h.reconciler.upsert(coffee()).await.unwrap();
    let record = h.local.get(outcome.local_id()).await.unwrap().unwrap();
    h.identity.sign_out();

    let removed = h.reconciler.remove(&record).await.unwrap();

    assert_eq!(removed, RemoveOutcome::LocalOnly);
    assert_eq!(h.remote.delete_calls(), 0);
    assert!(h.local.snapshot().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn legacy_edit_creates_duplicate_remote_document() {
    let h = harness(true, SyncPolicy::legacy()).await;
    let outcome = h.reconciler.upsert(coffee()).await.unwrap();
    let mut record = h.local.get(outcome.local_id()).await.unwrap().unwrap();

    record.amount = 5.0;
    h.reconciler.upsert(record).await.unwrap();

    assert_eq!(h.remote.document_count(USER), 2);
    assert_eq!(h.local.snapshot().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn edit_updates_remote_document_in_place() {
    let h = harness(true, SyncPolicy::default()).await;
    let outcome = h.reconciler.upsert(coffee()).await.unwrap();
    let mut record = h.local.get(outcome.local_id()).await.unwrap().unwrap();
    let remote_id = record.remote_id.clone().unwrap();

    record.amount = 5.0;
    let edited = h.reconciler.upsert(record).await.unwrap();

    assert_eq!(
        edited,
        UpsertOutcome::Synced {
            local_id: outcome.local_id(),
            remote_id: remote_id.clone(),
        }
    );
    let documents = h.remote.documents(USER);
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].1.amount, 5.0);
    assert_eq!(h.local.snapshot()[0].amount, 5.0);
}

#[tokio::test(flavor = "multi_thread")]
async fn edit_without_local_id_finds_row_by_remote_id() {
    let h = harness(true, SyncPolicy::default()).await;
    let outcome = h.reconciler.upsert(coffee()).await.unwrap();
    let mut record = h.local.get(outcome.local_id()).await.unwrap().unwrap();

    record.local_id = None;
    record.title = "Espresso".to_string();
    let edited = h.reconciler.upsert(record).await.unwrap();

    assert_eq!(edited.local_id(), outcome.local_id());
    let live = h.local.snapshot();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].title, "Espresso");
}

#[tokio::test(flavor = "multi_thread")]
async fn edit_of_vanished_document_recreates_it() {
    let h = harness(true, SyncPolicy::default()).await;
    let record = coffee().with_remote_id(RemoteId::new("gone"));

    let outcome = h.reconciler.upsert(record).await.unwrap();

    let UpsertOutcome::Synced { remote_id, .. } = outcome else {
        panic!("expected a synced outcome, got {outcome:?}");
    };
    assert_ne!(remote_id, RemoteId::new("gone"));
    assert_eq!(h.remote.update_calls(), 1);
    assert_eq!(h.remote.document_count(USER), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn edit_of_record_held_across_resync_keeps_one_row() {
    let h = harness(true, SyncPolicy::default()).await;
    let outcome = h.reconciler.upsert(coffee()).await.unwrap();
    let mut stale = h.local.get(outcome.local_id()).await.unwrap().unwrap();
    let remote_id = stale.remote_id.clone().unwrap();

    h.reconciler.resync().await.unwrap();
    let resynced = h.local.find_by_remote_id(&remote_id).await.unwrap().unwrap();
    assert_ne!(resynced.local_id, stale.local_id);

    stale.amount = 6.0;
    let edited = h.reconciler.upsert(stale.clone()).await.unwrap();

    assert_eq!(edited.local_id(), resynced.local_id.unwrap());
    let live = h.local.list().await.unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].remote_id, Some(remote_id.clone()));
    assert_eq!(live[0].amount, 6.0);
    assert_eq!(h.remote.document_count(USER), 1);

    let removed = h.reconciler.remove(&stale).await.unwrap();

    assert_eq!(removed, RemoveOutcome::RemoteDeleted);
    assert!(h.local.list().await.unwrap().is_empty());
    assert_eq!(h.remote.document_count(USER), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn upsert_with_deleted_local_id_gets_fresh_row() {
    let h = harness(false, SyncPolicy::default()).await;
    let outcome = h.reconciler.upsert(coffee()).await.unwrap();
    let record = h.local.get(outcome.local_id()).await.unwrap().unwrap();
    h.reconciler.remove(&record).await.unwrap();

    let revived = h.reconciler.upsert(record).await.unwrap();

    assert_ne!(revived.local_id(), outcome.local_id());
    assert_eq!(h.local.get(outcome.local_id()).await.unwrap(), None);
    assert_eq!(h.local.list().await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_remote_write_keeps_record_pending() {
    let h = harness(true, SyncPolicy::default()).await;
    h.remote.set_fail_create(true);

    let outcome = h.reconciler.upsert(coffee()).await.unwrap();

    assert!(matches!(outcome, UpsertOutcome::PendingSync { .. }));
    let stored = h.local.get(outcome.local_id()).await.unwrap().unwrap();
    assert!(stored.pending_sync);
    assert_eq!(stored.remote_id, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn legacy_failed_remote_write_is_abandoned() {
    let h = harness(true, SyncPolicy::legacy()).await;
    h.remote.set_fail_create(true);

    let result = h.reconciler.upsert(coffee()).await;

    assert!(matches!(result, Err(crate::Error::Remote(_))));
    assert!(h.local.list().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn push_pending_links_flagged_records() {
    let h = harness(true, SyncPolicy::default()).await;
    h.remote.set_offline(true);
    h.reconciler.upsert(coffee()).await.unwrap();
    h.reconciler.upsert(coffee()).await.unwrap();
    h.remote.set_offline(false);

    let pushed = h.reconciler.push_pending().await.unwrap();

    assert_eq!(pushed, 2);
    assert!(h.local.list_pending().await.unwrap().is_empty());
    assert!(h.local.snapshot().iter().all(ExpenseRecord::is_synced));
    assert_eq!(h.remote.document_count(USER), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn resync_pushes_pending_records_first() {
    let h = harness(true, SyncPolicy::default()).await;
    h.remote.set_fail_create(true);
    h.reconciler.upsert(coffee()).await.unwrap();
    h.remote.set_fail_create(false);

    let outcome = h.reconciler.resync().await.unwrap();

    assert_eq!(outcome, ResyncOutcome::Replaced { count: 1 });
    let live = h.local.snapshot();
    assert_eq!(live.len(), 1);
    assert!(live[0].is_synced());
    assert!(!live[0].pending_sync);
}

#[tokio::test(flavor = "multi_thread")]
async fn resync_aborts_when_pending_push_fails() {
    let h = harness(true, SyncPolicy::default()).await;
    h.remote.set_offline(true);
    h.reconciler.upsert(coffee()).await.unwrap();
    let before = h.local.list().await.unwrap();

    let result = h.reconciler.resync().await;

    assert!(result.is_err());
    assert_eq!(h.remote.fetch_calls(), 0);
    assert_eq!(h.local.list().await.unwrap(), before);
}

/// Remote store whose `fetch_all` pauses after taking its snapshot.
///
/// `create` signals `create_entered` so tests can tell whether a concurrent
/// upsert reached the remote store while the resync was paused.
struct GatedRemote {
    inner: MemoryRemoteStore,
    snapshot_taken: Notify,
    release: Notify,
    create_entered: Notify,
}

impl GatedRemote {
    fn new() -> Self {
        Self {
            inner: MemoryRemoteStore::new(),
            snapshot_taken: Notify::new(),
            release: Notify::new(),
            create_entered: Notify::new(),
        }
    }
}

const QUIET_PERIOD: Duration = Duration::from_millis(200);

#[async_trait]
impl RemoteStore for GatedRemote {
    async fn fetch_all(
        &self,
        user: &UserIdentity,
    ) -> RemoteResult<Vec<(RemoteId, ExpenseDocument)>> {
        let snapshot = self.inner.fetch_all(user).await?;
        self.snapshot_taken.notify_one();
        self.release.notified().await;
        Ok(snapshot)
    }

    async fn create(
        &self,
        user: &UserIdentity,
        document: &ExpenseDocument,
    ) -> RemoteResult<RemoteId> {
        self.create_entered.notify_one();
        self.inner.create(user, document).await
    }

    async fn update(
        &self,
        user: &UserIdentity,
        remote_id: &RemoteId,
        document: &ExpenseDocument,
    ) -> RemoteResult<()> {
        self.inner.update(user, remote_id, document).await
    }

    async fn delete_by_id(&self, user: &UserIdentity, remote_id: &RemoteId) -> RemoteResult<()> {
        self.inner.delete_by_id(user, remote_id).await
    }
}

async fn gated(policy: SyncPolicy) -> (LocalStore, Arc<GatedRemote>, Arc<Reconciler>) {
    let local = LocalStore::open_in_memory().await.unwrap();
    let remote = Arc::new(GatedRemote::new());
    let identity: Arc<dyn IdentityContext> =
        Arc::new(SessionIdentity::signed_in(UserIdentity::new(USER)));
    let reconciler = Reconciler::new(local.clone(), remote.clone(), identity).with_policy(policy);
    (local, remote, Arc::new(reconciler))
}

#[tokio::test(flavor = "multi_thread")]
async fn unserialized_resync_drops_concurrent_upsert() {
    let policy = SyncPolicy {
        serialize_writes: false,
        ..SyncPolicy::default()
    };
    let (local, remote, reconciler) = gated(policy).await;

    let resync = tokio::spawn({
        let reconciler = Arc::clone(&reconciler);
        async move { reconciler.resync().await }
    });
    remote.snapshot_taken.notified().await;

    reconciler.upsert(coffee()).await.unwrap();
    timeout(QUIET_PERIOD, remote.create_entered.notified())
        .await
        .unwrap();
    assert_eq!(local.snapshot().len(), 1);

    remote.release.notify_one();
    resync.await.unwrap().unwrap();

    assert!(local.list().await.unwrap().is_empty());
    assert_eq!(remote.inner.document_count(USER), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn serialized_resync_keeps_concurrent_upsert() {
    let (local, remote, reconciler) = gated(SyncPolicy::default()).await;

    let resync = tokio::spawn({
        let reconciler = Arc::clone(&reconciler);
        async move { reconciler.resync().await }
    });
    remote.snapshot_taken.notified().await;

    let upsert = tokio::spawn({
        let reconciler = Arc::clone(&reconciler);
        async move { reconciler.upsert(coffee()).await }
    });

    // The upsert must stay behind the writer lock while the resync is paused
    let reached_remote = timeout(QUIET_PERIOD, remote.create_entered.notified()).await;
    assert!(reached_remote.is_err());
    assert_eq!(remote.inner.create_calls(), 0);
    assert!(local.snapshot().is_empty());

    remote.release.notify_one();
    resync.await.unwrap().unwrap();
    upsert.await.unwrap().unwrap();

    let live = local.list().await.unwrap();
    assert_eq!(live.len(), 1);
    assert!(live[0].is_synced());
}

#[tokio::test(flavor = "multi_thread")]
async fn facade_tasks_update_live_list() {
    let h = harness(true, SyncPolicy::default()).await;
    let facade = SyncFacade::from_shared(Arc::clone(&h.reconciler));
    let mut live = facade.list_live();

    facade
        .insert("Train", 23.0, 1_700_000_000_000, "Transport")
        .await
        .unwrap();
    let inserted = live.borrow_and_update().clone();
    assert_eq!(inserted.len(), 1);
    assert!(inserted[0].is_synced());

    facade.delete(inserted[0].clone()).await.unwrap();
    assert!(live.borrow_and_update().is_empty());
    assert_eq!(h.remote.document_count(USER), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn facade_logs_failures_instead_of_returning_them() {
    let h = harness(true, SyncPolicy::default()).await;
    let facade = SyncFacade::from_shared(Arc::clone(&h.reconciler));
    let state = facade.sync_state();
    h.remote.set_fail_fetch(true);

    facade.resync_from_remote().await.unwrap();

    assert_eq!(*state.borrow(), SyncState::Error);
    assert!(facade.list_live().borrow().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn facade_push_pending_clears_flags() {
    let h = harness(true, SyncPolicy::default()).await;
    let facade = SyncFacade::from_shared(Arc::clone(&h.reconciler));
    h.remote.set_fail_create(true);
    facade
        .insert("Groceries", 61.3, 1_700_000_000_000, "Food")
        .await
        .unwrap();
    assert_eq!(h.local.list_pending().await.unwrap().len(), 1);
    h.remote.set_fail_create(false);

    facade.push_pending().await.unwrap();

    assert!(h.local.list_pending().await.unwrap().is_empty());
    assert_eq!(h.reconciler.state(), SyncState::Synced);
}
