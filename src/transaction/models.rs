//! Defines the core data model for transactions.

use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    database_id::{CategoryId, TransactionId, UserId},
};

/// Whether money was earned or spent.
///
/// Direction is carried by this type, never by the sign of the amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money coming in, e.g. wages.
    Income,
    /// Money going out, e.g. groceries.
    Expense,
}

impl TransactionType {
    /// The database/API representation of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }

    /// Parse the database/API representation of the type.
    ///
    /// Returns `None` for anything other than "income" or "expense".
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "income" => Some(TransactionType::Income),
            "expense" => Some(TransactionType::Expense),
            _ => None,
        }
    }

    pub(crate) fn from_sql_text(column: usize, text: &str) -> Result<Self, rusqlite::Error> {
        Self::parse(text).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                format!("invalid transaction type {text:?}").into(),
            )
        })
    }
}

/// An event where money was either earned or spent.
///
/// To create a new `Transaction`, use [Transaction::build] and
/// [crate::transaction::create_transaction].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The ID of the user that owns this transaction.
    pub user_id: UserId,
    /// The ID of the category the transaction belongs to.
    pub category_id: CategoryId,
    /// Whether this transaction is income or an expense.
    pub transaction_type: TransactionType,
    /// The amount of money, always positive, at most two decimal places.
    pub amount: Decimal,
    /// The business date when the transaction happened.
    pub date: Date,
    /// A text description of what the transaction was for.
    pub description: String,
    /// Free-form notes.
    pub notes: String,
    /// When the record was created (server-assigned).
    pub created_at: OffsetDateTime,
    /// When the record was last modified (server-assigned).
    pub updated_at: OffsetDateTime,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        transaction_type: TransactionType,
        amount: Decimal,
        date: Date,
        category_id: CategoryId,
    ) -> TransactionBuilder {
        TransactionBuilder {
            transaction_type,
            amount,
            date,
            category_id,
            description: String::new(),
            notes: String::new(),
        }
    }

    /// The amount with sign applied per the transaction type.
    ///
    /// Used for display and summation only, never stored.
    pub fn signed_amount(&self) -> Decimal {
        match self.transaction_type {
            TransactionType::Income => self.amount,
            TransactionType::Expense => -self.amount,
        }
    }
}

/// A builder for creating [Transaction] instances.
///
/// The amount and the category are validated when the builder is passed to
/// [crate::transaction::create_transaction] or
/// [crate::transaction::update_transaction], so an invalid transaction can
/// never be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionBuilder {
    /// Whether this transaction is income or an expense.
    pub transaction_type: TransactionType,
    /// The amount of money, must be positive with at most two decimal places.
    pub amount: Decimal,
    /// The business date when the transaction happened.
    pub date: Date,
    /// The ID of the category, must be owned by the same user and have a
    /// matching type.
    pub category_id: CategoryId,
    /// A text description of what the transaction was for.
    pub description: String,
    /// Free-form notes.
    pub notes: String,
}

impl TransactionBuilder {
    /// Set the description for the transaction.
    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_owned();
        self
    }

    /// Set the notes for the transaction.
    pub fn notes(mut self, notes: &str) -> Self {
        self.notes = notes.to_owned();
        self
    }
}

/// Convert a decimal amount into integer minor units (cents) for storage.
///
/// # Errors
/// Returns [Error::InvalidAmount] if the amount is zero or negative, has more
/// than two decimal places, or does not fit the storage integer.
pub(crate) fn to_minor_units(amount: Decimal) -> Result<i64, Error> {
    if amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount(format!(
            "{amount} is not greater than zero"
        )));
    }

    // Plain multiplication panics on overflow and the amount comes straight
    // from client input.
    let scaled = amount.checked_mul(Decimal::ONE_HUNDRED).ok_or_else(|| {
        Error::InvalidAmount(format!("{amount} is too large to store"))
    })?;

    if scaled.normalize().scale() != 0 {
        return Err(Error::InvalidAmount(format!(
            "{amount} has more than two decimal places"
        )));
    }

    scaled.to_i64().ok_or_else(|| {
        Error::InvalidAmount(format!("{amount} is too large to store"))
    })
}

/// Convert stored integer minor units back into a decimal amount.
pub(crate) fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}


#[cfg(test)]
mod amount_tests {
    use rust_decimal::{Decimal, dec};

    use crate::Error;

    use super::{from_minor_units, to_minor_units};

    #[test]
    fn converts_two_decimal_places() {
        assert_eq!(to_minor_units(dec!(123.45)), Ok(12345));
        assert_eq!(to_minor_units(dec!(1000)), Ok(100_000));
    }

    #[test]
    fn rejects_zero_and_negative_amounts() {
        assert!(matches!(
            to_minor_units(Decimal::ZERO),
            Err(Error::InvalidAmount(_))
        ));
        assert!(matches!(
            to_minor_units(dec!(-5.00)),
            Err(Error::InvalidAmount(_))
        ));
    }

    #[test]
    fn rejects_sub_cent_precision() {
        assert!(matches!(
            to_minor_units(dec!(0.005)),
            Err(Error::InvalidAmount(_))
        ));
    }

    #[test]
    fn rejects_amounts_too_large_to_store() {
        assert!(matches!(
            to_minor_units(Decimal::MAX),
            Err(Error::InvalidAmount(_))
        ));
    }

    #[test]
    fn minor_units_round_trip() {
        assert_eq!(from_minor_units(12345), dec!(123.45));
        assert_eq!(from_minor_units(0), dec!(0.00));
    }
}
