//! Read-side queries over the transaction ledger.
//!
//! All queries take a [TransactionFilter] so listing, totals and the
//! dashboard aggregates share one definition of "which transactions". The
//! filter compiles to a single SQL WHERE clause, so totals are computed in
//! the database and always agree with the rows a listing would return.

use std::ops::RangeInclusive;

use rusqlite::{Connection, params_from_iter, types::Value};
use rust_decimal::Decimal;
use serde::Serialize;
use time::Date;

use crate::{
    Error,
    database_id::{CategoryId, UserId},
};

use super::{
    db::map_transaction_row,
    models::{Transaction, TransactionType, from_minor_units},
};

/// A composable filter over a user's transactions.
///
/// An empty filter matches every transaction the user owns. Each setter
/// narrows the match, so filters read like the query they produce:
///
/// ```
/// use cashflow_rs::transaction::{TransactionFilter, TransactionType};
///
/// let filter = TransactionFilter::new()
///     .transaction_type(TransactionType::Expense)
///     .search("coffee");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    transaction_type: Option<TransactionType>,
    category_id: Option<CategoryId>,
    date_range: Option<RangeInclusive<Date>>,
    search: Option<String>,
}

impl TransactionFilter {
    /// Create a filter matching all of a user's transactions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Match only transactions of `transaction_type`.
    pub fn transaction_type(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = Some(transaction_type);
        self
    }

    /// Match only transactions in the category `category_id`.
    pub fn category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Match only transactions dated within `date_range` (inclusive).
    pub fn date_range(mut self, date_range: RangeInclusive<Date>) -> Self {
        self.date_range = Some(date_range);
        self
    }

    /// Match only transactions whose description or notes contain `text`
    /// (case-insensitive).
    pub fn search(mut self, text: &str) -> Self {
        self.search = Some(text.to_owned());
        self
    }

    /// Compile the filter into a WHERE clause and its parameters.
    ///
    /// The clause always begins with the user scope so no query can forget
    /// it.
    fn where_clause(&self, user_id: UserId) -> (String, Vec<Value>) {
        let mut clause = "t.user_id = ?".to_owned();
        let mut params = vec![Value::from(user_id)];

        if let Some(transaction_type) = self.transaction_type {
            clause.push_str(" AND t.transaction_type = ?");
            params.push(Value::from(transaction_type.as_str().to_owned()));
        }

        if let Some(category_id) = self.category_id {
            clause.push_str(" AND t.category_id = ?");
            params.push(Value::from(category_id));
        }

        if let Some(date_range) = &self.date_range {
            clause.push_str(" AND t.date >= ? AND t.date <= ?");
            params.push(Value::from(date_to_sql_text(*date_range.start())));
            params.push(Value::from(date_to_sql_text(*date_range.end())));
        }

        if let Some(search) = &self.search {
            clause.push_str(" AND (t.description LIKE ? OR t.notes LIKE ?)");
            let pattern = format!("%{search}%");
            params.push(Value::from(pattern.clone()));
            params.push(Value::from(pattern));
        }

        (clause, params)
    }
}

/// Stored dates are ISO-8601 text, so range comparisons are plain text
/// comparisons.
fn date_to_sql_text(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        date.month() as u8,
        date.day()
    )
}

/// Retrieve the transactions owned by `user_id` that match `filter`.
///
/// Transactions are ordered newest first: by date, then creation time, then
/// ID so the order is stable across identical timestamps.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_transactions(
    user_id: UserId,
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let (where_clause, params) = filter.where_clause(user_id);

    let query = format!(
        "SELECT t.id, t.user_id, t.category_id, t.transaction_type,
            t.amount_minor, t.date, t.description, t.notes, t.created_at,
            t.updated_at
            FROM \"transaction\" t
            WHERE {where_clause}
            ORDER BY t.date DESC, t.created_at DESC, t.id DESC"
    );

    connection
        .prepare(&query)?
        .query_map(params_from_iter(params), map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::SqlError))
        .collect()
}

/// Income and expense totals for a set of transactions.
///
/// Both totals are non-negative. The balance is derived, not stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Totals {
    /// The sum of all matching income amounts.
    pub total_income: Decimal,
    /// The sum of all matching expense amounts.
    pub total_expense: Decimal,
}

impl Totals {
    /// Income minus expenses. Negative when spending exceeds income.
    pub fn net_balance(&self) -> Decimal {
        self.total_income - self.total_expense
    }
}

/// Compute income and expense totals for the transactions matching `filter`.
///
/// The totals are computed in the database over integer minor units, so they
/// are exact and an empty match produces zero totals rather than an error.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_totals(
    user_id: UserId,
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<Totals, Error> {
    let (where_clause, params) = filter.where_clause(user_id);

    let query = format!(
        "SELECT
            IFNULL(SUM(CASE WHEN t.transaction_type = 'income'
                THEN t.amount_minor ELSE 0 END), 0),
            IFNULL(SUM(CASE WHEN t.transaction_type = 'expense'
                THEN t.amount_minor ELSE 0 END), 0)
            FROM \"transaction\" t
            WHERE {where_clause}"
    );

    let (income_minor, expense_minor): (i64, i64) = connection
        .prepare(&query)?
        .query_row(params_from_iter(params), |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?;

    Ok(Totals {
        total_income: from_minor_units(income_minor),
        total_expense: from_minor_units(expense_minor),
    })
}

/// The total spent in one category, for the category breakdown chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryExpenseTotal {
    /// The category name prefixed with its icon.
    pub name: String,
    /// The category icon.
    pub icon: String,
    /// The category display color.
    pub color: String,
    /// The total spent in this category.
    pub total: Decimal,
}

/// Compute per-category expense totals for `user_id`, largest first.
///
/// At most `limit` categories are returned. Ties are broken by category ID so
/// the cut-off is deterministic. Categories with no expenses are omitted.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_expense_totals_by_category(
    user_id: UserId,
    limit: u32,
    connection: &Connection,
) -> Result<Vec<CategoryExpenseTotal>, Error> {
    connection
        .prepare(
            "SELECT c.icon || ' ' || c.name, c.icon, c.color,
                SUM(t.amount_minor) AS total_minor
                FROM \"transaction\" t
                JOIN category c ON c.id = t.category_id
                WHERE t.user_id = ?1 AND t.transaction_type = 'expense'
                GROUP BY t.category_id
                ORDER BY total_minor DESC, t.category_id ASC
                LIMIT ?2",
        )?
        .query_map((user_id, limit), |row| {
            Ok(CategoryExpenseTotal {
                name: row.get(0)?,
                icon: row.get(1)?,
                color: row.get(2)?,
                total: from_minor_units(row.get(3)?),
            })
        })?
        .map(|maybe_total| maybe_total.map_err(Error::SqlError))
        .collect()
}
