//! Database migrations
//!
//! The local database is a cache of the remote collection, so a schema version
//! mismatch is resolved by dropping every table and recreating the current
//! schema rather than migrating rows forward.

use crate::error::Result;
use libsql::Connection;

/// Current schema version
pub const CURRENT_VERSION: i32 = 1;

const CACHE_TABLES: [&str; 2] = ["expenses", "schema_version"];

/// Bring the schema to [`CURRENT_VERSION`], recreating it on mismatch
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;

    if version == CURRENT_VERSION {
        return Ok(());
    }

    if version != 0 {
        tracing::warn!(
            "Local schema version {} does not match {}; recreating expense cache",
            version,
            CURRENT_VERSION
        );
        drop_all(conn).await?;
    }

    create_current(conn).await
}

/// Get the current schema version
pub(crate) async fn get_version(conn: &Connection) -> Result<i32> {
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

async fn drop_all(conn: &Connection) -> Result<()> {
    for table in CACHE_TABLES {
        conn.execute(&format!("DROP TABLE IF EXISTS {table}"), ())
            .await?;
    }
    Ok(())
}

async fn create_current(conn: &Connection) -> Result<()> {
    // libsql doesn't have execute_batch, so we run each statement separately
    conn.execute("BEGIN TRANSACTION", ()).await?;

    let statements = [
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        // AUTOINCREMENT keeps row ids monotonic even after the table is emptied
        "CREATE TABLE IF NOT EXISTS expenses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            remote_id TEXT,
            title TEXT NOT NULL,
            amount REAL NOT NULL,
            date INTEGER NOT NULL,
            category TEXT NOT NULL,
            pending_sync INTEGER NOT NULL DEFAULT 0
        )",
        "CREATE INDEX IF NOT EXISTS idx_expenses_date ON expenses(date DESC)",
        "CREATE INDEX IF NOT EXISTS idx_expenses_remote_id ON expenses(remote_id)",
        "CREATE INDEX IF NOT EXISTS idx_expenses_pending ON expenses(pending_sync)",
        "INSERT INTO schema_version (version) VALUES (1)",
    ];

    for stmt in statements {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}
