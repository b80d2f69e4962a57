//! libSQL handle for the expense cache

use crate::error::Result;
use libsql::{Builder, Connection, Database as LibSqlDatabase};
use std::path::Path;

use super::migrations;

/// Open cache database plus the single connection every query goes through.
pub struct Database {
    // Dropping the database closes the connection
    _db: LibSqlDatabase,
    conn: Connection,
}

impl Database {
    /// Open (or create) the cache file at `path` and bring its schema up to date.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let db = Builder::new_local(&path_str).build().await?;
        Self::from_libsql(db).await
    }

    /// Throwaway cache for tests.
    pub async fn open_in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        Self::from_libsql(db).await
    }

    async fn from_libsql(db: LibSqlDatabase) -> Result<Self> {
        let conn = db.connect()?;
        let database = Self { _db: db, conn };
        database.configure().await?;
        database.migrate().await?;
        Ok(database)
    }

    /// Best-effort pragmas; failures are ignored.
    async fn configure(&self) -> Result<()> {
        // In-memory databases reject WAL, which is fine
        self.conn
            .execute("PRAGMA journal_mode = WAL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA synchronous = NORMAL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA cache_size = 10000;", ())
            .await
            .ok();
        Ok(())
    }

    async fn migrate(&self) -> Result<()> {
        migrations::run(&self.conn).await
    }

    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}
