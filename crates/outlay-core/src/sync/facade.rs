//! Fire-and-forget entry points for UI collaborators.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::reconciler::Reconciler;
use crate::models::{ExpenseRecord, NewExpense};
use crate::state::SyncState;

/// Public contract between the UI and the sync core.
///
/// Mutating calls return immediately with the spawned task's handle; failures
/// are logged, never surfaced. Callers that need results use [`Self::reconciler`].
#[derive(Clone)]
pub struct SyncFacade {
    reconciler: Arc<Reconciler>,
}

impl SyncFacade {
    pub fn new(reconciler: Reconciler) -> Self {
        Self::from_shared(Arc::new(reconciler))
    }

    pub const fn from_shared(reconciler: Arc<Reconciler>) -> Self {
        Self { reconciler }
    }

    pub const fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    pub fn list_live(&self) -> watch::Receiver<Vec<ExpenseRecord>> {
        self.reconciler.local().subscribe()
    }

    pub fn sync_state(&self) -> watch::Receiver<SyncState> {
        self.reconciler.subscribe_state()
    }

    pub fn insert(
        &self,
        title: impl Into<String>,
        amount: f64,
        date: i64,
        category: impl Into<String>,
    ) -> JoinHandle<()> {
        let record = ExpenseRecord::from(NewExpense::new(title, amount, date, category));
        self.update(record)
    }

    pub fn update(&self, record: ExpenseRecord) -> JoinHandle<()> {
        let reconciler = Arc::clone(&self.reconciler);
        tokio::spawn(async move {
            if let Err(error) = reconciler.upsert(record).await {
                tracing::error!("Failed to save expense: {error}");
            }
        })
    }

    pub fn delete(&self, record: ExpenseRecord) -> JoinHandle<()> {
        let reconciler = Arc::clone(&self.reconciler);
        tokio::spawn(async move {
            if let Err(error) = reconciler.remove(&record).await {
                tracing::error!("Failed to delete expense '{}': {error}", record.title);
            }
        })
    }

    pub fn resync_from_remote(&self) -> JoinHandle<()> {
        let reconciler = Arc::clone(&self.reconciler);
        tokio::spawn(async move {
            if let Err(error) = reconciler.resync().await {
                tracing::error!("Resync failed: {error}");
            }
        })
    }

    pub fn push_pending(&self) -> JoinHandle<()> {
        let reconciler = Arc::clone(&self.reconciler);
        tokio::spawn(async move {
            match reconciler.push_pending().await {
                Ok(0) => {}
                Ok(pushed) => tracing::info!("Pushed {pushed} pending expenses"),
                Err(error) => tracing::error!("Pending push failed: {error}"),
            }
        })
    }
}
