//! Spendbook is the storage and reporting core of a personal expense tracker.
//!
//! Users record dated, categorised expenses and query aggregated views over
//! date ranges. This crate owns the durable state (users, categories,
//! expenses in SQLite) and the pure aggregation engine that turns a
//! range-filtered expense set into a [report::Report]. Request routing,
//! session handling and rendering live in external collaborators: every entry
//! point here takes an already-resolved [user::UserID].
//!
//! All records are partitioned by their owning user. Store operations are
//! scoped to one partition, so cross-user access is structurally impossible
//! rather than merely filtered.

#![warn(missing_docs)]

pub mod category;
pub mod db;
pub mod expense;
pub mod migrate;
pub mod password;
pub mod range;
pub mod report;
pub mod store;
pub mod user;

pub use range::DateRange;
pub use store::Store;

/// The errors that may occur in the expense tracking core.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// An expense was created or updated with a zero or negative amount.
    #[error("expense amount must be greater than zero")]
    InvalidAmount,

    /// An empty (or all-whitespace) string was used as a category name.
    #[error("category name cannot be empty")]
    EmptyCategoryName,

    /// The user already has a category with this name, compared
    /// case-insensitively.
    #[error("a category named \"{0}\" already exists")]
    DuplicateCategoryName(String),

    /// The category ID on an expense write did not resolve to a category
    /// owned by the same user.
    ///
    /// A category belonging to another user produces this same error so that
    /// the caller learns nothing about other users' records.
    #[error("the category ID does not refer to one of the user's categories")]
    InvalidCategory,

    /// Tried to delete one of the starter categories.
    #[error("default categories cannot be deleted")]
    DeleteDefaultCategory,

    /// Tried to delete a category that is still referenced by at least one
    /// expense.
    #[error("the category is referenced by one or more expenses")]
    CategoryInUse,

    /// The username is already taken, compared case-insensitively.
    #[error("the username \"{0}\" is already taken")]
    DuplicateUsername(String),

    /// An unexpected error occurred in the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server,
    /// not shown to the client.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The requested record does not exist, or is owned by a different user.
    ///
    /// The two cases are deliberately indistinguishable so that probing for
    /// other users' record IDs reveals nothing.
    #[error("the requested record could not be found")]
    NotFound,

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLock,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {error}");
                Error::SqlError(error)
            }
        }
    }
}
