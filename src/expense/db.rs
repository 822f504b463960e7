//! Database operations for expenses.

use rusqlite::{Connection, Row, Transaction, TransactionBehavior};
use time::OffsetDateTime;

use crate::{
    Error,
    category::{lookup_category, seed_if_empty},
    db::{RecordKind, next_record_id},
    expense::{Expense, NewExpense},
    range::DateRange,
    user::UserID,
};

/// Initialize the expense table and indexes.
pub fn create_expense_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS expense (
            user_id INTEGER REFERENCES user(id),
            id INTEGER NOT NULL,
            amount REAL NOT NULL,
            date TEXT NOT NULL,
            category_id INTEGER NOT NULL,
            note TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (user_id, id)
        );

        CREATE INDEX IF NOT EXISTS idx_expense_user_date ON expense(user_id, date);",
    )?;

    Ok(())
}

/// Retrieve a user's expenses, optionally limited to a date range.
///
/// The range is inclusive at both ends. Results are ordered by date,
/// newest first; expenses on the same date are ordered by creation time,
/// newest first.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn list_expenses(
    user_id: UserID,
    range: Option<DateRange>,
    connection: &Connection,
) -> Result<Vec<Expense>, Error> {
    let expenses = match range {
        Some(range) => connection
            .prepare(
                "SELECT user_id, id, amount, date, category_id, note, created_at, updated_at
                 FROM expense
                 WHERE user_id = :user_id AND date >= :start AND date <= :end
                 ORDER BY date DESC, created_at DESC",
            )?
            .query_map(
                rusqlite::named_params! {
                    ":user_id": user_id.as_i64(),
                    ":start": range.start,
                    ":end": range.end,
                },
                map_row,
            )?
            .collect::<Result<Vec<_>, _>>()?,
        None => connection
            .prepare(
                "SELECT user_id, id, amount, date, category_id, note, created_at, updated_at
                 FROM expense
                 WHERE user_id = :user_id
                 ORDER BY date DESC, created_at DESC",
            )?
            .query_map(&[(":user_id", &user_id.as_i64())], map_row)?
            .collect::<Result<Vec<_>, _>>()?,
    };

    Ok(expenses)
}

/// Retrieve a single expense in a user's partition.
///
/// # Errors
/// Returns [Error::NotFound] if the ID is unknown to this user, including
/// when it exists in another user's partition.
pub fn get_expense(id: i64, user_id: UserID, connection: &Connection) -> Result<Expense, Error> {
    connection
        .prepare(
            "SELECT user_id, id, amount, date, category_id, note, created_at, updated_at
             FROM expense WHERE user_id = :user_id AND id = :id",
        )?
        .query_row(&[(":user_id", &user_id.as_i64()), (":id", &id)], map_row)
        .map_err(|error| error.into())
}

/// Create an expense and return it with its assigned ID.
///
/// The category is resolved in the same user's partition before anything is
/// written; the ID is drawn from the user's expense sequence. Both timestamps
/// are set to the same instant.
///
/// # Errors
/// Returns [Error::InvalidCategory] if the payload's category ID does not
/// resolve to one of the user's categories. A category ID that exists in
/// another user's partition produces the same error.
pub fn create_expense(
    new_expense: NewExpense,
    user_id: UserID,
    connection: &Connection,
) -> Result<Expense, Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    seed_if_empty(user_id, &transaction)?;
    resolve_category(new_expense.category_id(), user_id, &transaction)?;

    let id = next_record_id(user_id.as_i64(), RecordKind::Expense, &transaction)?;
    let created_at = OffsetDateTime::now_utc();
    let expense = Expense {
        id,
        user_id,
        amount: new_expense.amount(),
        date: new_expense.date(),
        category_id: new_expense.category_id(),
        note: new_expense.note().map(str::to_owned),
        created_at,
        updated_at: created_at,
    };

    transaction.execute(
        "INSERT INTO expense (user_id, id, amount, date, category_id, note, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        (
            user_id.as_i64(),
            expense.id,
            expense.amount,
            expense.date,
            expense.category_id,
            &expense.note,
            expense.created_at,
            expense.updated_at,
        ),
    )?;

    transaction.commit()?;
    tracing::debug!("created expense {id} for user {user_id}");

    Ok(expense)
}

/// Replace an expense's fields, keeping its ID, owner, and creation time.
///
/// A `None` note clears any stored note. The updated timestamp is refreshed.
///
/// # Errors
/// - [Error::NotFound] if the ID is unknown to this user.
/// - [Error::InvalidCategory] if the payload's category ID does not resolve
///   to one of the user's categories.
pub fn update_expense(
    id: i64,
    fields: NewExpense,
    user_id: UserID,
    connection: &Connection,
) -> Result<Expense, Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let existing = get_expense(id, user_id, &transaction)?;
    resolve_category(fields.category_id(), user_id, &transaction)?;

    let updated_at = OffsetDateTime::now_utc();
    let expense = Expense {
        id,
        user_id,
        amount: fields.amount(),
        date: fields.date(),
        category_id: fields.category_id(),
        note: fields.note().map(str::to_owned),
        created_at: existing.created_at,
        updated_at,
    };

    transaction.execute(
        "UPDATE expense
         SET amount = ?1, date = ?2, category_id = ?3, note = ?4, updated_at = ?5
         WHERE user_id = ?6 AND id = ?7",
        (
            expense.amount,
            expense.date,
            expense.category_id,
            &expense.note,
            expense.updated_at,
            user_id.as_i64(),
            id,
        ),
    )?;

    transaction.commit()?;
    tracing::debug!("updated expense {id} for user {user_id}");

    Ok(expense)
}

/// Delete an expense from a user's partition.
///
/// # Errors
/// Returns [Error::NotFound] if the ID is unknown to this user.
pub fn delete_expense(id: i64, user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let rows_deleted = connection.execute(
        "DELETE FROM expense WHERE user_id = ?1 AND id = ?2",
        (user_id.as_i64(), id),
    )?;

    if rows_deleted == 0 {
        return Err(Error::NotFound);
    }

    tracing::debug!("deleted expense {id} for user {user_id}");

    Ok(())
}

fn resolve_category(category_id: i64, user_id: UserID, connection: &Connection) -> Result<(), Error> {
    match lookup_category(category_id, user_id, connection) {
        Ok(_) => Ok(()),
        Err(Error::NotFound) => Err(Error::InvalidCategory),
        Err(error) => Err(error),
    }
}

fn map_row(row: &Row) -> Result<Expense, rusqlite::Error> {
    let raw_user_id = row.get(0)?;

    Ok(Expense {
        user_id: UserID::new(raw_user_id),
        id: row.get(1)?,
        amount: row.get(2)?,
        date: row.get(3)?,
        category_id: row.get(4)?,
        note: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}
