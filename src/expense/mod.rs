//! Expense records: the model, validated write payloads, and database
//! operations.

mod db;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{Error, user::UserID};

pub use db::{
    create_expense, create_expense_table, delete_expense, get_expense, list_expenses,
    update_expense,
};

/// A single dated expense belonging to one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    /// The expense's ID, unique within the owning user's partition.
    pub id: i64,
    /// The ID of the owning user.
    pub user_id: UserID,
    /// The amount spent. Always greater than zero.
    pub amount: f64,
    /// The date the expense occurred on.
    pub date: Date,
    /// The ID of the category this expense belongs to, within the same user's
    /// partition.
    pub category_id: i64,
    /// An optional free-text note.
    pub note: Option<String>,
    /// When the record was created.
    pub created_at: OffsetDateTime,
    /// When the record was last written. Equal to `created_at` until the first
    /// update.
    pub updated_at: OffsetDateTime,
}

/// The validated fields written on expense creation and update.
///
/// Updates replace every field, so the same payload serves both operations.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewExpense {
    amount: f64,
    date: Date,
    category_id: i64,
    note: Option<String>,
}

impl NewExpense {
    /// Create an expense payload.
    ///
    /// # Errors
    /// Returns [Error::InvalidAmount] if `amount` is not strictly greater than
    /// zero (this includes NaN).
    pub fn new(amount: f64, date: Date, category_id: i64, note: Option<String>) -> Result<Self, Error> {
        if !(amount > 0.0) {
            return Err(Error::InvalidAmount);
        }

        Ok(Self {
            amount,
            date,
            category_id,
            note,
        })
    }

    /// The amount spent.
    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// The date the expense occurred on.
    pub fn date(&self) -> Date {
        self.date
    }

    /// The ID of the category the expense belongs to.
    pub fn category_id(&self) -> i64 {
        self.category_id
    }

    /// The free-text note, if any.
    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }
}

#[cfg(test)]
mod new_expense_tests {
    use time::macros::date;

    use crate::{Error, expense::NewExpense};

    #[test]
    fn new_fails_on_zero_amount() {
        let result = NewExpense::new(0.0, date!(2024 - 01 - 15), 1, None);

        assert_eq!(result, Err(Error::InvalidAmount));
    }

    #[test]
    fn new_fails_on_negative_amount() {
        let result = NewExpense::new(-12.50, date!(2024 - 01 - 15), 1, None);

        assert_eq!(result, Err(Error::InvalidAmount));
    }

    #[test]
    fn new_fails_on_nan_amount() {
        let result = NewExpense::new(f64::NAN, date!(2024 - 01 - 15), 1, None);

        assert_eq!(result, Err(Error::InvalidAmount));
    }

    #[test]
    fn new_succeeds_on_positive_amount() {
        let result = NewExpense::new(12.50, date!(2024 - 01 - 15), 1, Some("lunch".to_owned()));

        assert!(result.is_ok());
    }
}
