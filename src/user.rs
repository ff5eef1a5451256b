//! Minimal user model.
//!
//! Authentication and registration are handled by an upstream service; the
//! application only needs user rows as the owner of categories and
//! transactions, and as the scope for every query.

use rusqlite::Connection;
use serde::Serialize;

use crate::{Error, database_id::UserId};

/// The owner of a set of categories and transactions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    /// The ID of the user.
    pub id: UserId,
    /// The account name assigned by the upstream identity provider.
    pub name: String,
}

/// Create a new user in the database.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error, including when the
/// name is already taken.
pub fn create_user(name: &str, connection: &Connection) -> Result<User, Error> {
    connection.execute("INSERT INTO user (name) VALUES (?1)", [name])?;

    Ok(User {
        id: connection.last_insert_rowid(),
        name: name.to_owned(),
    })
}

/// Retrieve a user by their `id`.
///
/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to a user.
pub fn get_user(id: UserId, connection: &Connection) -> Result<User, Error> {
    let user = connection
        .prepare("SELECT id, name FROM user WHERE id = :id")?
        .query_row(&[(":id", &id)], |row| {
            Ok(User {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;

    Ok(user)
}
