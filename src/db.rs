//! Database initialization and the per-partition ID sequence.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{Error, category, expense, user};

/// Create all application tables in a single exclusive transaction.
///
/// Safe to call on an already-initialized database; every table is created
/// with `IF NOT EXISTS`.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    user::create_user_table(&transaction)?;
    category::create_category_table(&transaction)?;
    expense::create_expense_table(&transaction)?;
    create_id_sequence_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// The record types that draw IDs from the per-partition sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecordKind {
    Category,
    Expense,
}

impl RecordKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Expense => "expense",
        }
    }
}

/// Allocate the next record ID in a user's partition.
///
/// Each (user, record kind) pair owns a monotonically increasing counter
/// starting at 1. Allocated IDs are never reused, even after deletions.
pub(crate) fn next_record_id(
    user_id: i64,
    kind: RecordKind,
    connection: &Connection,
) -> Result<i64, Error> {
    connection
        .query_row(
            "INSERT INTO id_sequence (user_id, record, next_id) VALUES (?1, ?2, 1)
             ON CONFLICT (user_id, record) DO UPDATE SET next_id = next_id + 1
             RETURNING next_id",
            (user_id, kind.as_str()),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Advance a partition's sequence so that it is at least `floor`.
///
/// Used when existing IDs are adopted into a partition (legacy migration) to
/// keep later allocations collision-free. A no-op if the sequence is already
/// past `floor`.
pub(crate) fn advance_record_id(
    user_id: i64,
    kind: RecordKind,
    floor: i64,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "INSERT INTO id_sequence (user_id, record, next_id) VALUES (?1, ?2, ?3)
         ON CONFLICT (user_id, record) DO UPDATE SET next_id = max(next_id, excluded.next_id)",
        (user_id, kind.as_str(), floor),
    )?;

    Ok(())
}

fn create_id_sequence_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS id_sequence (
                user_id INTEGER NOT NULL,
                record TEXT NOT NULL,
                next_id INTEGER NOT NULL,
                PRIMARY KEY (user_id, record)
                )",
        (),
    )?;

    Ok(())
}
