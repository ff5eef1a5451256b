//! Creates the application's database schema.

use rusqlite::{Connection, Transaction as SqlTransaction};

use crate::Error;

/// Create the tables for the domain models.
///
/// Tables are created inside a single exclusive SQL transaction so that a
/// partially initialized schema is never left behind.
///
/// # Errors
/// Returns an [Error::SqlError] if table creation fails.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    // Foreign key enforcement is off by default and per-connection.
    connection.pragma_update(None, "foreign_keys", true)?;

    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    transaction.execute(
        "CREATE TABLE IF NOT EXISTS user (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
            )",
        (),
    )?;

    transaction.execute(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            category_type TEXT NOT NULL CHECK(category_type IN ('income', 'expense')),
            icon TEXT NOT NULL,
            color TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            UNIQUE(user_id, name, category_type)
            )",
        (),
    )?;

    transaction.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            category_id INTEGER NOT NULL,
            transaction_type TEXT NOT NULL CHECK(transaction_type IN ('income', 'expense')),
            amount_minor INTEGER NOT NULL CHECK(amount_minor > 0),
            date TEXT NOT NULL,
            description TEXT NOT NULL,
            notes TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE CASCADE
            )",
        (),
    )?;

    // The transaction list and dashboard queries always filter by user first.
    transaction.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_date ON \"transaction\"(user_id, date)",
        (),
    )?;
    transaction.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_type
            ON \"transaction\"(user_id, transaction_type)",
        (),
    )?;
    transaction.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_category
            ON \"transaction\"(user_id, category_id)",
        (),
    )?;

    transaction.commit()?;

    Ok(())
}
