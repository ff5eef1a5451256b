//! Defines the JSON endpoints for listing and creating categories.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of rejecting the request like axum::Form.
use axum_extra::extract::Form;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    auth::AuthenticatedUser,
    database_id::CategoryId,
    transaction::TransactionType,
};

use super::{
    db::{create_category, get_categories},
    models::{Category, CategoryName, NewCategory},
};

/// The state needed to list or create categories.
#[derive(Clone)]
pub struct CategoryState {
    /// The database connection for managing categories.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The query parameters for the category list endpoint.
#[derive(Debug, Deserialize)]
pub struct CategoryListParams {
    /// Restrict the list to categories of this type ("income" or "expense").
    /// Unrecognized values are ignored and the full list is returned.
    #[serde(rename = "type")]
    pub category_type: Option<String>,
}

/// A category as rendered in JSON responses.
#[derive(Debug, Serialize)]
pub struct CategoryJson {
    /// The ID of the category.
    pub id: CategoryId,
    /// The name of the category.
    pub name: String,
    /// The name prefixed with the icon, for display.
    pub display_name: String,
    /// The category icon.
    pub icon: String,
    /// The category display color.
    pub color: String,
    /// "income" or "expense".
    #[serde(rename = "type")]
    pub category_type: &'static str,
}

impl From<Category> for CategoryJson {
    fn from(category: Category) -> Self {
        Self {
            display_name: category.display_name(),
            id: category.id,
            name: category.name.to_string(),
            icon: category.icon,
            color: category.color,
            category_type: category.category_type.as_str(),
        }
    }
}

/// The response body for the category list endpoint.
#[derive(Debug, Serialize)]
pub struct CategoryListResponse {
    /// The user's categories.
    pub categories: Vec<CategoryJson>,
}

/// A route handler for listing the user's categories as JSON.
pub async fn get_categories_endpoint(
    State(state): State<CategoryState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Query(params): Query<CategoryListParams>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let category_type = params
        .category_type
        .as_deref()
        .and_then(TransactionType::parse);

    let categories = get_categories(user_id, category_type, &connection)?
        .into_iter()
        .map(CategoryJson::from)
        .collect();

    Ok(Json(CategoryListResponse { categories }).into_response())
}

/// The form data for creating a category.
#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    /// The name of the category.
    pub name: String,
    /// "income" or "expense".
    #[serde(rename = "type")]
    pub category_type: TransactionType,
    /// An optional emoji shown next to the name.
    pub icon: Option<String>,
    /// An optional display color.
    pub color: Option<String>,
}

/// A route handler for creating a new category, returns the created category
/// as JSON on success.
pub async fn create_category_endpoint(
    State(state): State<CategoryState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Form(form): Form<CategoryForm>,
) -> Result<Response, Error> {
    let name = CategoryName::new(&form.name)?;

    let mut new_category = NewCategory::new(name, form.category_type);
    if let Some(icon) = form.icon {
        new_category = new_category.icon(&icon);
    }
    if let Some(color) = form.color {
        new_category = new_category.color(&color);
    }

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let category = create_category(user_id, new_category, &connection)?;

    Ok((StatusCode::CREATED, Json(CategoryJson::from(category))).into_response())
}
