//! Data models for Outlay

mod category;
mod expense;
mod list_item;

pub use category::Category;
pub use expense::{ExpenseRecord, LocalId, NewExpense, RemoteId};
pub use list_item::{group_by_category, ListItem};
