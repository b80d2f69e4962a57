//! Expense repository implementation

use libsql::{Connection, Row, Value};

use crate::error::{Error, Result};
use crate::models::{ExpenseRecord, LocalId, RemoteId};

const SELECT_COLUMNS: &str = "id, remote_id, title, amount, date, category, pending_sync";

/// libSQL-backed expense table access
pub struct LibSqlExpenseRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlExpenseRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// List all expenses, newest first
    pub async fn list(&self) -> Result<Vec<ExpenseRecord>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM expenses ORDER BY date DESC, id DESC");
        self.query_records(&sql, ()).await
    }

    /// List expenses kept locally after a failed remote write
    pub async fn list_pending(&self) -> Result<Vec<ExpenseRecord>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM expenses WHERE pending_sync = 1 ORDER BY id ASC"
        );
        self.query_records(&sql, ()).await
    }

    /// Fetch a single expense by local id
    pub async fn get(&self, local_id: LocalId) -> Result<Option<ExpenseRecord>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM expenses WHERE id = ?1");
        let mut records = self
            .query_records(&sql, vec![Value::Integer(local_id.get())])
            .await?;
        Ok(records.pop())
    }

    /// Point lookup by remote document id
    pub async fn find_by_remote_id(&self, remote_id: &RemoteId) -> Result<Option<ExpenseRecord>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM expenses WHERE remote_id = ?1 LIMIT 1");
        let mut records = self
            .query_records(&sql, vec![Value::Text(remote_id.as_str().to_string())])
            .await?;
        Ok(records.pop())
    }

    /// Insert a record, replacing any row that already holds its local id.
    ///
    /// Records without a local id get a freshly allocated one.
    pub async fn insert(&self, record: &ExpenseRecord) -> Result<LocalId> {
        let mut params = Self::field_values(record);
        let mut rows = if let Some(local_id) = record.local_id {
            params.insert(0, Value::Integer(local_id.get()));
            self.conn
                .query(
                    "INSERT OR REPLACE INTO expenses
                        (id, remote_id, title, amount, date, category, pending_sync)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                     RETURNING id",
                    params,
                )
                .await?
        } else {
            self.conn
                .query(
                    "INSERT INTO expenses
                        (remote_id, title, amount, date, category, pending_sync)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     RETURNING id",
                    params,
                )
                .await?
        };

        let row = rows
            .next()
            .await?
            .ok_or_else(|| Error::Database("insert did not return a row id".to_string()))?;
        let raw_id = row.get::<i64>(0)?;
        LocalId::new(raw_id)
            .ok_or_else(|| Error::Database(format!("invalid row id allocated: {raw_id}")))
    }

    /// Replace the row matching the record's local id.
    ///
    /// Returns whether a row was updated; missing rows are left alone.
    pub async fn update(&self, record: &ExpenseRecord) -> Result<bool> {
        let Some(local_id) = record.local_id else {
            return Ok(false);
        };

        let mut params = Self::field_values(record);
        params.push(Value::Integer(local_id.get()));
        let rows = self
            .conn
            .execute(
                "UPDATE expenses
                 SET remote_id = ?1, title = ?2, amount = ?3, date = ?4, category = ?5,
                     pending_sync = ?6
                 WHERE id = ?7",
                params,
            )
            .await?;
        Ok(rows > 0)
    }

    /// Delete the row matching the local id. Returns whether a row was removed.
    pub async fn delete(&self, local_id: LocalId) -> Result<bool> {
        let rows = self
            .conn
            .execute(
                "DELETE FROM expenses WHERE id = ?1",
                vec![Value::Integer(local_id.get())],
            )
            .await?;
        Ok(rows > 0)
    }

    /// Remove every expense row
    pub async fn delete_all(&self) -> Result<u64> {
        Ok(self.conn.execute("DELETE FROM expenses", ()).await?)
    }

    /// Empty the table and insert `records` in a single transaction
    pub async fn replace_all(&self, records: &[ExpenseRecord]) -> Result<()> {
        self.conn.execute("BEGIN TRANSACTION", ()).await?;

        let outcome = async {
            self.delete_all().await?;
            for record in records {
                self.insert(record).await?;
            }
            Ok::<(), Error>(())
        }
        .await;

        if let Err(error) = outcome {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(error);
        }

        if let Err(error) = self.conn.execute("COMMIT", ()).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(error.into());
        }

        Ok(())
    }

    fn field_values(record: &ExpenseRecord) -> Vec<Value> {
        vec![
            record
                .remote_id
                .as_ref()
                .map_or(Value::Null, |id| Value::Text(id.as_str().to_string())),
            Value::Text(record.title.clone()),
            Value::Real(record.amount),
            Value::Integer(record.date),
            Value::Text(record.category.clone()),
            Value::Integer(i64::from(record.pending_sync)),
        ]
    }

    async fn query_records(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<ExpenseRecord>> {
        let mut rows = self.conn.query(sql, params).await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(Self::parse_expense(&row)?);
        }
        Ok(records)
    }

    /// Parse an expense from a database row
    fn parse_expense(row: &Row) -> Result<ExpenseRecord> {
        let raw_id = row.get::<i64>(0)?;
        let remote_id = match row.get_value(1)? {
            Value::Text(id) => Some(RemoteId::new(id)),
            _ => None,
        };
        // Amounts written as integers by other tools come back as INTEGER
        let amount = match row.get_value(3)? {
            Value::Real(amount) => amount,
            #[allow(clippy::cast_precision_loss)]
            Value::Integer(amount) => amount as f64,
            other => {
                return Err(Error::Database(format!(
                    "unexpected amount value for expense {raw_id}: {other:?}"
                )))
            }
        };

        Ok(ExpenseRecord {
            local_id: LocalId::new(raw_id),
            remote_id,
            title: row.get(2)?,
            amount,
            date: row.get(4)?,
            category: row.get(5)?,
            pending_sync: row.get::<i64>(6)? != 0,
        })
    }
}
