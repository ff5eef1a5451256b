//! Categories module
//!
//! Categories are user-owned labels for income or expenses. A transaction
//! may only reference a category of its own type and owner.

mod db;
mod endpoints;
mod models;

pub use db::{create_category, get_categories, get_category};
pub use endpoints::{
    CategoryForm, CategoryJson, CategoryListParams, CategoryListResponse, CategoryState,
    create_category_endpoint, get_categories_endpoint,
};
pub use models::{Category, CategoryName, DEFAULT_COLOR, DEFAULT_ICON, NewCategory};
