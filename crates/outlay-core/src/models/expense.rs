//! Expense model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Local cache identifier, allocated by the local store and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(i64);

impl LocalId {
    /// Wrap a raw row id.
    ///
    /// Returns `None` for zero and negative values, which the store treats as unassigned.
    #[must_use]
    pub const fn new(raw: i64) -> Option<Self> {
        if raw > 0 {
            Some(Self(raw))
        } else {
            None
        }
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LocalId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s
            .trim()
            .parse::<i64>()
            .map_err(|error| format!("invalid local id '{s}': {error}"))?;
        Self::new(raw).ok_or_else(|| format!("local id must be positive, got {raw}"))
    }
}

/// Document identifier generated by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An expense as entered on the entry form, before it is stored anywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpense {
    pub title: String,
    pub amount: f64,
    /// Point in time chosen by the user (Unix ms)
    pub date: i64,
    pub category: String,
}

impl NewExpense {
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        amount: f64,
        date: i64,
        category: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            amount,
            date,
            category: category.into(),
        }
    }
}

/// A tracked expense as held by the local cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    /// Local row id; `None` until the local store assigns one
    pub local_id: Option<LocalId>,
    /// Remote document id; `None` while the record is local-only
    pub remote_id: Option<RemoteId>,
    pub title: String,
    pub amount: f64,
    /// Point in time chosen by the user (Unix ms)
    pub date: i64,
    pub category: String,
    /// Set when an online write could not reach the remote store
    #[serde(default)]
    pub pending_sync: bool,
}

impl ExpenseRecord {
    /// Create an unsaved, local-only record
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        amount: f64,
        date: i64,
        category: impl Into<String>,
    ) -> Self {
        Self {
            local_id: None,
            remote_id: None,
            title: title.into(),
            amount,
            date,
            category: category.into(),
            pending_sync: false,
        }
    }

    /// Whether the record is linked to a remote document
    #[must_use]
    pub const fn is_synced(&self) -> bool {
        self.remote_id.is_some()
    }

    #[must_use]
    pub fn with_local_id(mut self, local_id: LocalId) -> Self {
        self.local_id = Some(local_id);
        self
    }

    #[must_use]
    pub fn with_remote_id(mut self, remote_id: RemoteId) -> Self {
        self.remote_id = Some(remote_id);
        self
    }
}

impl From<NewExpense> for ExpenseRecord {
    fn from(value: NewExpense) -> Self {
        Self::new(value.title, value.amount, value.date, value.category)
    }
}
