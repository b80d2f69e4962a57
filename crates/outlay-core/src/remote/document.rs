//! Remote document layout for a single expense

use serde::{Deserialize, Serialize};

use crate::models::{ExpenseRecord, RemoteId};

/// One expense document under `users/{user}/expenses/{id}`.
///
/// `id` repeats the document's own key. It is redundant but persisted for
/// compatibility with existing clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseDocument {
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub amount: f64,
    pub date: i64,
    pub category: String,
}

impl ExpenseDocument {
    /// Build the document payload for a record, without an id yet.
    #[must_use]
    pub fn from_record(record: &ExpenseRecord) -> Self {
        Self {
            id: record
                .remote_id
                .as_ref()
                .map(|id| id.as_str().to_string())
                .unwrap_or_default(),
            title: record.title.clone(),
            amount: record.amount,
            date: record.date,
            category: record.category.clone(),
        }
    }

    /// Copy of this document carrying `remote_id` as its self-reference.
    #[must_use]
    pub fn with_id(mut self, remote_id: &RemoteId) -> Self {
        self.id = remote_id.as_str().to_string();
        self
    }

    /// Convert a fetched document into a local record linked to `remote_id`.
    ///
    /// The document key wins over the stored `id` field.
    #[must_use]
    pub fn into_record(self, remote_id: RemoteId) -> ExpenseRecord {
        ExpenseRecord::new(self.title, self.amount, self.date, self.category)
            .with_remote_id(remote_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_key_overrides_stored_id() {
        let document = ExpenseDocument {
            id: "stale".to_string(),
            title: "Taxi".to_string(),
            amount: 18.0,
            date: 5,
            category: "Transport".to_string(),
        };

        let record = document.into_record(RemoteId::new("doc-9"));
        assert_eq!(record.remote_id, Some(RemoteId::new("doc-9")));
        assert!(record.local_id.is_none());
    }

    #[test]
    fn serializes_with_compatible_field_names() {
        let record = ExpenseRecord::new("Tea", 3.0, 42, "Food");
        let document = ExpenseDocument::from_record(&record).with_id(&RemoteId::new("x1"));
        let json = serde_json::to_value(&document).unwrap();

        assert_eq!(json["id"], "x1");
        assert_eq!(json["title"], "Tea");
        assert_eq!(json["amount"], 3.0);
        assert_eq!(json["date"], 42);
        assert_eq!(json["category"], "Food");
    }
}
