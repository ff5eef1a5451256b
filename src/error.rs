//! Defines the app level error type and its conversion to structured JSON
//! error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request did not carry an authenticated user identity.
    ///
    /// Authentication itself is handled upstream; this error means the
    /// authenticating proxy did not set the user header, or set garbage.
    #[error("the request does not identify an authenticated user")]
    NotAuthenticated,

    /// The requested resource was not found.
    ///
    /// Also returned when a resource exists but belongs to another user, so
    /// that the response does not leak the existence of other users' records.
    #[error("the requested resource could not be found")]
    NotFound,

    /// A transaction amount was not a positive decimal with at most two
    /// decimal places.
    ///
    /// Direction is carried by the transaction type, never by the sign of the
    /// amount, so zero and negative amounts are rejected outright.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The transaction type did not match the type of the referenced category.
    #[error("a {transaction_type} transaction cannot use a {category_type} category")]
    CategoryTypeMismatch {
        /// The type of the transaction being saved.
        transaction_type: &'static str,
        /// The type of the category it referenced.
        category_type: &'static str,
    },

    /// The category ID used to create a transaction did not refer to a
    /// category owned by the requesting user.
    #[error("the category ID does not refer to a valid category")]
    InvalidCategory,

    /// The user already has a category with this name and type.
    #[error("the category \"{0}\" already exists")]
    DuplicateCategory(String),

    /// An empty string was used to create a category name.
    #[error("category name cannot be empty")]
    EmptyCategoryName,

    /// Tried to update a transaction that does not exist.
    #[error("tried to update a transaction that is not in the database")]
    UpdateMissingTransaction,

    /// Tried to delete a transaction that does not exist.
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// An error occurred while getting the local timezone from a canonical
    /// timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezone(String),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 787 occurs when a FOREIGN KEY constraint failed.
            // The only nullable-free foreign key reachable from client input
            // is the transaction's category.
            rusqlite::Error::SqliteFailure(sql_error, Some(_)) if sql_error.extended_code == 787 => {
                Error::InvalidCategory
            }
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("category") =>
            {
                Error::DuplicateCategory(String::new())
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

/// The JSON payload returned for failed API requests.
#[derive(Debug, Serialize)]
struct ErrorBody {
    /// A stable, machine-readable reason string.
    error: &'static str,
    /// A human-readable description of what went wrong.
    message: String,
    /// The form field the error relates to, for validation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
}

impl Error {
    /// The stable machine-readable reason string for this error.
    pub fn reason(&self) -> &'static str {
        match self {
            Error::NotAuthenticated => "not_authenticated",
            Error::NotFound | Error::UpdateMissingTransaction | Error::DeleteMissingTransaction => {
                "not_found"
            }
            Error::InvalidAmount(_) => "invalid_amount",
            Error::CategoryTypeMismatch { .. } => "category_type_mismatch",
            Error::InvalidCategory => "invalid_category",
            Error::DuplicateCategory(_) => "duplicate_category",
            Error::EmptyCategoryName => "empty_category_name",
            Error::InvalidTimezone(_) => "invalid_timezone",
            Error::DatabaseLockError | Error::SqlError(_) => "internal_error",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Error::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Error::NotFound | Error::UpdateMissingTransaction | Error::DeleteMissingTransaction => {
                StatusCode::NOT_FOUND
            }
            Error::InvalidAmount(_)
            | Error::CategoryTypeMismatch { .. }
            | Error::InvalidCategory
            | Error::DuplicateCategory(_)
            | Error::EmptyCategoryName => StatusCode::UNPROCESSABLE_ENTITY,
            Error::InvalidTimezone(_) | Error::DatabaseLockError | Error::SqlError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn field(&self) -> Option<&'static str> {
        match self {
            Error::InvalidAmount(_) => Some("amount"),
            Error::CategoryTypeMismatch { .. } | Error::InvalidCategory => Some("category"),
            Error::DuplicateCategory(_) | Error::EmptyCategoryName => Some("name"),
            _ => None,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Internal errors are not intended to be shown to the client.
        let message = match &self {
            Error::InvalidTimezone(_) | Error::DatabaseLockError | Error::SqlError(_) => {
                tracing::error!("An unexpected error occurred: {}", self);
                "An unexpected error occurred, check the server logs for more details.".to_owned()
            }
            error => error.to_string(),
        };

        let body = ErrorBody {
            error: self.reason(),
            message,
            field: self.field(),
        };

        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod error_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use super::Error;

    #[test]
    fn maps_no_rows_to_not_found() {
        let error = Error::from(rusqlite::Error::QueryReturnedNoRows);

        assert_eq!(error, Error::NotFound);
    }

    #[test]
    fn reason_strings_are_stable() {
        let cases = [
            (Error::NotAuthenticated, "not_authenticated"),
            (Error::NotFound, "not_found"),
            (Error::InvalidAmount("0".to_owned()), "invalid_amount"),
            (
                Error::CategoryTypeMismatch {
                    transaction_type: "income",
                    category_type: "expense",
                },
                "category_type_mismatch",
            ),
            (Error::InvalidCategory, "invalid_category"),
            (Error::DuplicateCategory("Food".to_owned()), "duplicate_category"),
            (Error::EmptyCategoryName, "empty_category_name"),
        ];

        for (error, want) in cases {
            assert_eq!(error.reason(), want);
        }
    }

    #[test]
    fn validation_errors_are_unprocessable_entity() {
        let response = Error::InvalidAmount("-1".to_owned()).into_response();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn scoping_errors_are_not_found() {
        let response = Error::NotFound.into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
