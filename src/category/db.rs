//! Database functions for categories.

use rusqlite::{Connection, Row};

use crate::{
    Error,
    database_id::{CategoryId, UserId},
    transaction::TransactionType,
};

use super::models::{Category, CategoryName, NewCategory};

/// Create a new category in the database for `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateCategory] if the user already has a category with this
///   name and type,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_category(
    user_id: UserId,
    new_category: NewCategory,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .execute(
            "INSERT INTO category (user_id, name, category_type, icon, color)
                VALUES (?1, ?2, ?3, ?4, ?5)",
            (
                user_id,
                new_category.name.as_ref(),
                new_category.category_type.as_str(),
                &new_category.icon,
                &new_category.color,
            ),
        )
        .map_err(|error| match Error::from(error) {
            Error::DuplicateCategory(_) => {
                Error::DuplicateCategory(new_category.name.to_string())
            }
            error => error,
        })?;

    Ok(Category {
        id: connection.last_insert_rowid(),
        user_id,
        name: new_category.name,
        category_type: new_category.category_type,
        icon: new_category.icon,
        color: new_category.color,
    })
}

/// Retrieve a category by its `id`, scoped to `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to a category owned by
/// `user_id`. Another user's category produces the same error so the caller
/// cannot learn that it exists.
pub fn get_category(
    id: CategoryId,
    user_id: UserId,
    connection: &Connection,
) -> Result<Category, Error> {
    let category = connection
        .prepare(
            "SELECT id, user_id, name, category_type, icon, color FROM category
                WHERE id = :id AND user_id = :user_id",
        )?
        .query_row(&[(":id", &id), (":user_id", &user_id)], map_category_row)?;

    Ok(category)
}

/// Retrieve the categories owned by `user_id`, optionally filtered by type.
///
/// Categories are ordered by type and then name, matching the list view.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_categories(
    user_id: UserId,
    category_type: Option<TransactionType>,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    let mut query = "SELECT id, user_id, name, category_type, icon, color FROM category
        WHERE user_id = ?1"
        .to_owned();

    if category_type.is_some() {
        query.push_str(" AND category_type = ?2");
    }

    query.push_str(" ORDER BY category_type, name");

    let mut statement = connection.prepare(&query)?;

    let rows = match category_type {
        Some(category_type) => {
            statement.query_map((user_id, category_type.as_str()), map_category_row)?
        }
        None => statement.query_map([user_id], map_category_row)?,
    };

    rows.map(|maybe_category| maybe_category.map_err(Error::SqlError))
        .collect()
}

pub(crate) fn map_category_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let type_text: String = row.get(3)?;

    Ok(Category {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: CategoryName::new_unchecked(&row.get::<_, String>(2)?),
        category_type: TransactionType::from_sql_text(3, &type_text)?,
        icon: row.get(4)?,
        color: row.get(5)?,
    })
}
