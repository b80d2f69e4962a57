//! Shared local expense cache used by the reconciler and UI collaborators.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use crate::db::{Database, LibSqlExpenseRepository};
use crate::models::{ExpenseRecord, LocalId, RemoteId};
use crate::Result;

/// Thread-safe handle to the local expense cache.
///
/// Every committed write republishes the full expense list to subscribers.
#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
    live: Arc<watch::Sender<Vec<ExpenseRecord>>>,
}

impl LocalStore {
    /// Open the cache at the given filesystem path.
    ///
    /// A file that is not a valid database is moved aside and recreated, since
    /// the cache can always be rebuilt from the remote collection.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = match Database::open(&db_path).await {
            Ok(db) => db,
            Err(error) if Self::is_corrupted_db_error(&error) => {
                tracing::warn!(
                    "Local cache at {} is unreadable: {}. Recreating it.",
                    db_path.display(),
                    error
                );
                Self::quarantine_corrupted_db_files(&db_path)?;
                Database::open(&db_path).await?
            }
            Err(error) => return Err(error),
        };

        Self::from_database(db, Some(db_path)).await
    }

    /// Open an in-memory cache (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Self::from_database(db, None).await
    }

    async fn from_database(db: Database, db_path: Option<PathBuf>) -> Result<Self> {
        let initial = LibSqlExpenseRepository::new(db.connection()).list().await?;
        let (live, _) = watch::channel(initial);
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path,
            live: Arc::new(live),
        })
    }

    /// Path of the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Subscribe to the live expense list, newest first.
    pub fn subscribe(&self) -> watch::Receiver<Vec<ExpenseRecord>> {
        self.live.subscribe()
    }

    /// Latest published expense list.
    pub fn snapshot(&self) -> Vec<ExpenseRecord> {
        self.live.borrow().clone()
    }

    /// Read the expense list from the database, newest first.
    pub async fn list(&self) -> Result<Vec<ExpenseRecord>> {
        let db = self.db.lock().await;
        LibSqlExpenseRepository::new(db.connection()).list().await
    }

    /// List records waiting for a remote write.
    pub async fn list_pending(&self) -> Result<Vec<ExpenseRecord>> {
        let db = self.db.lock().await;
        LibSqlExpenseRepository::new(db.connection())
            .list_pending()
            .await
    }

    /// Fetch a record by local id.
    pub async fn get(&self, local_id: LocalId) -> Result<Option<ExpenseRecord>> {
        let db = self.db.lock().await;
        LibSqlExpenseRepository::new(db.connection())
            .get(local_id)
            .await
    }

    /// Find the record linked to a remote document.
    pub async fn find_by_remote_id(&self, remote_id: &RemoteId) -> Result<Option<ExpenseRecord>> {
        let db = self.db.lock().await;
        LibSqlExpenseRepository::new(db.connection())
            .find_by_remote_id(remote_id)
            .await
    }

    /// Insert a record, or replace the row holding its local id.
    pub async fn insert(&self, record: &ExpenseRecord) -> Result<LocalId> {
        let db = self.db.lock().await;
        let repo = LibSqlExpenseRepository::new(db.connection());
        let local_id = repo.insert(record).await?;
        self.publish(&repo).await?;
        Ok(local_id)
    }

    /// Replace the row matching the record's local id; no-op when absent.
    pub async fn update(&self, record: &ExpenseRecord) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlExpenseRepository::new(db.connection());
        if repo.update(record).await? {
            self.publish(&repo).await?;
        } else {
            tracing::debug!("Skipped update for missing expense {:?}", record.local_id);
        }
        Ok(())
    }

    /// Delete the row matching the record's local id.
    pub async fn delete(&self, record: &ExpenseRecord) -> Result<()> {
        let Some(local_id) = record.local_id else {
            tracing::debug!("Skipped delete for unsaved expense '{}'", record.title);
            return Ok(());
        };

        let db = self.db.lock().await;
        let repo = LibSqlExpenseRepository::new(db.connection());
        if repo.delete(local_id).await? {
            self.publish(&repo).await?;
        }
        Ok(())
    }

    /// Remove every cached expense.
    pub async fn delete_all(&self) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlExpenseRepository::new(db.connection());
        repo.delete_all().await?;
        self.publish(&repo).await
    }

    /// Swap the whole cache for `records` atomically.
    pub async fn replace_all(&self, records: &[ExpenseRecord]) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlExpenseRepository::new(db.connection());
        repo.replace_all(records).await?;
        self.publish(&repo).await
    }

    async fn publish(&self, repo: &LibSqlExpenseRepository<'_>) -> Result<()> {
        let records = repo.list().await?;
        self.live.send_replace(records);
        Ok(())
    }

    fn is_corrupted_db_error(error: &crate::Error) -> bool {
        let message = error.to_string().to_ascii_lowercase();
        message.contains("file is not a database") || message.contains("malformed")
    }

    fn quarantine_corrupted_db_files(db_path: &Path) -> Result<()> {
        if db_path.exists() {
            let timestamp = chrono::Utc::now().timestamp_millis();
            let base_name = db_path
                .file_name()
                .map_or_else(|| "outlay.db".into(), |name| name.to_string_lossy());
            let backup_path = db_path.with_file_name(format!("{base_name}.corrupt-{timestamp}"));

            std::fs::rename(db_path, &backup_path)?;
            tracing::warn!(
                "Moved corrupted local cache from {} to {}",
                db_path.display(),
                backup_path.display()
            );
        }

        let Some(parent) = db_path.parent() else {
            return Ok(());
        };
        let Some(base_name) = db_path.file_name().and_then(|name| name.to_str()) else {
            return Ok(());
        };
        let sidecar_prefix = format!("{base_name}-");

        for entry in std::fs::read_dir(parent)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            if file_name.starts_with(&sidecar_prefix) {
                let path = entry.path();
                std::fs::remove_file(&path)?;
                tracing::warn!("Removed stale cache file {}", path.display());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn lunch() -> ExpenseRecord {
        ExpenseRecord::new("Lunch", 12.5, 1_000, "Food")
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn writes_are_published_to_subscribers() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let mut live = store.subscribe();
        assert!(live.borrow_and_update().is_empty());

        let id = store.insert(&lunch()).await.unwrap();

        assert!(live.has_changed().unwrap());
        let published = live.borrow_and_update().clone();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].local_id, Some(id));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_of_missing_row_does_not_publish() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let mut live = store.subscribe();
        live.borrow_and_update();

        let ghost = lunch().with_local_id(LocalId::new(9).unwrap());
        store.update(&ghost).await.unwrap();

        assert!(!live.has_changed().unwrap());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_removes_row_and_publishes() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let id = store.insert(&lunch()).await.unwrap();

        store.delete(&lunch().with_local_id(id)).await.unwrap();

        assert!(store.snapshot().is_empty());
        assert!(store.get(id).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reopening_file_keeps_rows() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("nested").join("outlay.db");

        {
            let store = LocalStore::open_path(&db_path).await.unwrap();
            store.insert(&lunch()).await.unwrap();
        }

        let reopened = LocalStore::open_path(&db_path).await.unwrap();
        assert_eq!(reopened.snapshot().len(), 1);
        assert_eq!(reopened.path(), Some(db_path.as_path()));
    }

    #[test]
    fn quarantine_moves_db_and_removes_sidecars() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("outlay.db");
        let wal_path = tmp.path().join("outlay.db-wal");
        let shm_path = tmp.path().join("outlay.db-shm");

        std::fs::write(&db_path, b"bad-db").unwrap();
        std::fs::write(&wal_path, b"wal").unwrap();
        std::fs::write(&shm_path, b"shm").unwrap();

        LocalStore::quarantine_corrupted_db_files(&db_path).unwrap();

        assert!(!db_path.exists());
        assert!(!wal_path.exists());
        assert!(!shm_path.exists());
        let found_backup = std::fs::read_dir(tmp.path()).unwrap().any(|entry| {
            entry
                .unwrap()
                .file_name()
                .to_string_lossy()
                .starts_with("outlay.db.corrupt-")
        });
        assert!(found_backup);
    }

    #[test]
    fn detects_corrupted_db_errors() {
        assert!(LocalStore::is_corrupted_db_error(&crate::Error::Database(
            "SQLite failure: file is not a database".to_string()
        )));
        assert!(!LocalStore::is_corrupted_db_error(
            &crate::Error::Database("insert did not return a row id".to_string())
        ));
    }
}
