//! Database layer for Outlay

mod connection;
mod migrations;
mod repository;

pub use connection::Database;
pub use repository::LibSqlExpenseRepository;
