//! Category-grouped list rows for expense list views

use serde::Serialize;

use super::ExpenseRecord;

/// A single row in a grouped expense list
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ListItem {
    /// Heading for a category, with the sum of its expenses
    CategoryHeader { category: String, total: f64 },
    ExpenseRow(ExpenseRecord),
}

/// Group records by category.
///
/// Categories appear in ascending order, and expenses within a category are
/// ordered by date ascending. Each group starts with its header.
#[must_use]
pub fn group_by_category(records: &[ExpenseRecord]) -> Vec<ListItem> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|left, right| {
        left.category
            .cmp(&right.category)
            .then(left.date.cmp(&right.date))
    });

    let mut items = Vec::with_capacity(sorted.len());
    let mut start = 0;
    while start < sorted.len() {
        let category = sorted[start].category.clone();
        let end = sorted[start..]
            .iter()
            .position(|record| record.category != category)
            .map_or(sorted.len(), |offset| start + offset);

        let group = &sorted[start..end];
        let total = group.iter().map(|record| record.amount).sum();
        items.push(ListItem::CategoryHeader { category, total });
        items.extend(group.iter().cloned().map(ListItem::ExpenseRow));
        start = end;
    }

    items
}
