//! Adoption of ownerless legacy records.
//!
//! Databases created before accounts existed hold categories and expenses
//! with a NULL `user_id`. Those rows are invisible to every scoped query.
//! [migrate_ownerless] hands all of them to one user in a single transaction
//! and bumps the user's ID sequences past the adopted IDs so later
//! allocations cannot collide.

use std::fmt::Display;

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{
    Error,
    db::{RecordKind, advance_record_id},
    user::{UserID, get_user_by_id},
};

/// The number of records adopted by a migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationSummary {
    /// How many ownerless categories were assigned to the user.
    pub categories_adopted: usize,
    /// How many ownerless expenses were assigned to the user.
    pub expenses_adopted: usize,
}

impl MigrationSummary {
    /// Whether the run found nothing to adopt.
    pub fn is_noop(&self) -> bool {
        self.categories_adopted == 0 && self.expenses_adopted == 0
    }
}

impl Display for MigrationSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} categories and {} expenses adopted",
            self.categories_adopted, self.expenses_adopted
        )
    }
}

/// Assign every ownerless record to `user_id`.
///
/// Runs in one transaction and is idempotent: a second run finds no ownerless
/// rows and reports a no-op. If an adopted record's ID collides with one
/// already in the user's partition the transaction fails and nothing is
/// changed, so migrating into a fresh account (before any categories are
/// seeded or created) is the safe path.
///
/// # Errors
/// Returns [Error::NotFound] if `user_id` does not belong to a registered
/// user, or [Error::SqlError] on an ID collision or other SQL error.
pub fn migrate_ownerless(
    user_id: UserID,
    connection: &Connection,
) -> Result<MigrationSummary, Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let user = get_user_by_id(user_id, &transaction)?;

    let categories_adopted = transaction.execute(
        "UPDATE category SET user_id = ?1 WHERE user_id IS NULL",
        (user_id.as_i64(),),
    )?;
    let expenses_adopted = transaction.execute(
        "UPDATE expense SET user_id = ?1 WHERE user_id IS NULL",
        (user_id.as_i64(),),
    )?;

    advance_sequence_past_adopted_ids(user_id, RecordKind::Category, &transaction)?;
    advance_sequence_past_adopted_ids(user_id, RecordKind::Expense, &transaction)?;

    transaction.commit()?;

    let summary = MigrationSummary {
        categories_adopted,
        expenses_adopted,
    };
    tracing::info!(
        "migrated ownerless records to user {} ({}): {summary}",
        user.id,
        user.username
    );

    Ok(summary)
}

fn advance_sequence_past_adopted_ids(
    user_id: UserID,
    kind: RecordKind,
    connection: &Connection,
) -> Result<(), Error> {
    let table = match kind {
        RecordKind::Category => "category",
        RecordKind::Expense => "expense",
    };

    let max_id: i64 = connection.query_row(
        &format!("SELECT COALESCE(MAX(id), 0) FROM {table} WHERE user_id = ?1"),
        (user_id.as_i64(),),
        |row| row.get(0),
    )?;

    advance_record_id(user_id.as_i64(), kind, max_id, connection)
}
