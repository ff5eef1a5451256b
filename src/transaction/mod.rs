//! Transactions module
//!
//! A transaction records money earned or spent on a date, filed under a
//! category of the same type. This module covers the data model, the
//! database lifecycle, the composable read-side queries and the JSON
//! endpoints.

mod db;
mod endpoints;
mod models;
mod query;

pub use db::{create_transaction, delete_transaction, get_transaction, update_transaction};
pub use endpoints::{
    TransactionForm, TransactionListParams, TransactionListResponse, TransactionState,
    TotalsSummary, create_transaction_endpoint, delete_transaction_endpoint,
    get_transactions_endpoint, update_transaction_endpoint,
};
pub use models::{Transaction, TransactionBuilder, TransactionType};
pub use query::{
    CategoryExpenseTotal, Totals, TransactionFilter, get_expense_totals_by_category,
    get_totals, get_transactions,
};
