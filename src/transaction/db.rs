//! Database functions for creating, retrieving, updating and deleting
//! transactions.
//!
//! All functions are scoped to a user ID. A transaction ID belonging to
//! another user behaves exactly like an ID that does not exist.

use rusqlite::{Connection, Row};
use time::OffsetDateTime;

use crate::{
    Error,
    category::get_category,
    database_id::{TransactionId, UserId},
};

use super::models::{
    Transaction, TransactionBuilder, from_minor_units, to_minor_units,
};

/// Create a new transaction in the database for `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if the amount is not positive or has more than
///   two decimal places,
/// - [Error::InvalidCategory] if the category does not exist or belongs to
///   another user,
/// - [Error::CategoryTypeMismatch] if the category type does not match the
///   transaction type,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    user_id: UserId,
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let amount_minor = to_minor_units(builder.amount)?;
    check_category(user_id, &builder, connection)?;

    let now = OffsetDateTime::now_utc();

    connection.execute(
        "INSERT INTO \"transaction\"
            (user_id, category_id, transaction_type, amount_minor, date,
                description, notes, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        (
            user_id,
            builder.category_id,
            builder.transaction_type.as_str(),
            amount_minor,
            builder.date,
            &builder.description,
            &builder.notes,
            now,
            now,
        ),
    )?;

    Ok(Transaction {
        id: connection.last_insert_rowid(),
        user_id,
        category_id: builder.category_id,
        transaction_type: builder.transaction_type,
        amount: from_minor_units(amount_minor),
        date: builder.date,
        description: builder.description,
        notes: builder.notes,
        created_at: now,
        updated_at: now,
    })
}

/// Retrieve a transaction by its `id`, scoped to `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to a transaction owned by
/// `user_id`.
pub fn get_transaction(
    id: TransactionId,
    user_id: UserId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "SELECT id, user_id, category_id, transaction_type, amount_minor,
                date, description, notes, created_at, updated_at
                FROM \"transaction\"
                WHERE id = :id AND user_id = :user_id",
        )?
        .query_row(
            &[(":id", &id), (":user_id", &user_id)],
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Replace the editable fields of a transaction, scoped to `user_id`.
///
/// The update is full-row: every editable field takes the value from
/// `builder`. `created_at` is preserved and `updated_at` is refreshed.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingTransaction] if `id` does not refer to a
///   transaction owned by `user_id`,
/// - [Error::InvalidAmount], [Error::InvalidCategory] or
///   [Error::CategoryTypeMismatch] under the same conditions as
///   [create_transaction],
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_transaction(
    id: TransactionId,
    user_id: UserId,
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let amount_minor = to_minor_units(builder.amount)?;
    check_category(user_id, &builder, connection)?;

    let rows_updated = connection.execute(
        "UPDATE \"transaction\"
            SET category_id = ?1, transaction_type = ?2, amount_minor = ?3,
                date = ?4, description = ?5, notes = ?6, updated_at = ?7
            WHERE id = ?8 AND user_id = ?9",
        (
            builder.category_id,
            builder.transaction_type.as_str(),
            amount_minor,
            builder.date,
            &builder.description,
            &builder.notes,
            OffsetDateTime::now_utc(),
            id,
            user_id,
        ),
    )?;

    if rows_updated == 0 {
        return Err(Error::UpdateMissingTransaction);
    }

    get_transaction(id, user_id, connection)
}

/// Delete a transaction by its `id`, scoped to `user_id`.
///
/// # Errors
/// Returns [Error::DeleteMissingTransaction] if `id` does not refer to a
/// transaction owned by `user_id`.
pub fn delete_transaction(
    id: TransactionId,
    user_id: UserId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_deleted = connection.execute(
        "DELETE FROM \"transaction\" WHERE id = ?1 AND user_id = ?2",
        (id, user_id),
    )?;

    if rows_deleted == 0 {
        return Err(Error::DeleteMissingTransaction);
    }

    Ok(())
}

/// Check that the builder's category exists, is owned by `user_id` and has a
/// type matching the transaction type.
fn check_category(
    user_id: UserId,
    builder: &TransactionBuilder,
    connection: &Connection,
) -> Result<(), Error> {
    let category = get_category(builder.category_id, user_id, connection)
        .map_err(|error| match error {
            Error::NotFound => Error::InvalidCategory,
            error => error,
        })?;

    if category.category_type != builder.transaction_type {
        return Err(Error::CategoryTypeMismatch {
            transaction_type: builder.transaction_type.as_str(),
            category_type: category.category_type.as_str(),
        });
    }

    Ok(())
}

pub(crate) fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let type_text: String = row.get(3)?;
    let amount_minor: i64 = row.get(4)?;

    Ok(Transaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        category_id: row.get(2)?,
        transaction_type: super::TransactionType::from_sql_text(3, &type_text)?,
        amount: from_minor_units(amount_minor),
        date: row.get(5)?,
        description: row.get(6)?,
        notes: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}
