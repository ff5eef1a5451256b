//! Defines the `Category` type and the types needed to create a category.
//!
//! A category labels transactions of a single type; a transaction may only
//! reference a category of its own type and owner.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{
    Error,
    database_id::{CategoryId, UserId},
    transaction::TransactionType,
};

/// The icon used when a category is created without one.
pub const DEFAULT_ICON: &str = "\u{1F4B0}";

/// The display color used when a category is created without one.
pub const DEFAULT_COLOR: &str = "#FF6B6B";

/// The name of a category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name.
    ///
    /// # Errors
    /// Returns [Error::EmptyCategoryName] if `name` is an empty string.
    pub fn new(name: &str) -> Result<Self, Error> {
        if name.is_empty() {
            Err(Error::EmptyCategoryName)
        } else {
            Ok(Self(name.to_owned()))
        }
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user-owned label for income or expenses, e.g. 'Groceries', 'Wages'.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Hash)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The ID of the user that owns the category.
    pub user_id: UserId,
    /// The name of the category, unique per (user, name, type).
    pub name: CategoryName,
    /// Whether the category labels income or expense transactions.
    pub category_type: TransactionType,
    /// An emoji shown next to the name.
    pub icon: String,
    /// The color used for this category in charts, e.g. "#4ECDC4".
    pub color: String,
}

impl Category {
    /// The name prefixed with the category icon, as shown in the UI and in
    /// the category breakdown chart labels.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.icon, self.name)
    }
}

/// The fields needed to create a new [Category].
#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    /// The name of the category.
    pub name: CategoryName,
    /// Whether the category labels income or expense transactions.
    pub category_type: TransactionType,
    /// An emoji shown next to the name.
    pub icon: String,
    /// The color used for this category in charts.
    pub color: String,
}

impl NewCategory {
    /// Create the fields for a new category with the default icon and color.
    pub fn new(name: CategoryName, category_type: TransactionType) -> Self {
        Self {
            name,
            category_type,
            icon: DEFAULT_ICON.to_owned(),
            color: DEFAULT_COLOR.to_owned(),
        }
    }

    /// Set the icon for the category.
    pub fn icon(mut self, icon: &str) -> Self {
        self.icon = icon.to_owned();
        self
    }

    /// Set the display color for the category.
    pub fn color(mut self, color: &str) -> Self {
        self.color = color.to_owned();
        self
    }
}

#[cfg(test)]
mod category_name_tests {
    use crate::Error;

    use super::{Category, CategoryName};
    use crate::transaction::TransactionType;

    #[test]
    fn new_fails_on_empty_string() {
        let category_name = CategoryName::new("");

        assert_eq!(category_name, Err(Error::EmptyCategoryName));
    }

    #[test]
    fn new_succeeds_on_non_empty_string() {
        let category_name = CategoryName::new("\u{1F525}");

        assert!(category_name.is_ok())
    }

    #[test]
    fn display_name_prefixes_icon() {
        let category = Category {
            id: 1,
            user_id: 1,
            name: CategoryName::new_unchecked("Food"),
            category_type: TransactionType::Expense,
            icon: "\u{1F355}".to_owned(),
            color: "#FECA57".to_owned(),
        };

        assert_eq!(category.display_name(), "\u{1F355} Food");
    }
}
