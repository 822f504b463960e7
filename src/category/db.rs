//! Database operations for categories.
//!
//! All operations are scoped to one user's partition. Multi-statement
//! operations run inside a SQLite transaction so that callers never observe
//! partial writes; the caller is expected to hold the connection lock for the
//! duration of the call (see [crate::store::Store]).

use rusqlite::{Connection, Row, Transaction, TransactionBehavior};
use time::OffsetDateTime;

use crate::{
    Error,
    category::{
        Category, CategoryName, CategoryUpdate, FALLBACK_COLOR, FALLBACK_ICON, NewCategory,
        STARTER_CATEGORIES,
    },
    db::{RecordKind, next_record_id},
    user::UserID,
};

/// Initialize the category table and indexes.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            user_id INTEGER REFERENCES user(id),
            id INTEGER NOT NULL,
            name TEXT NOT NULL,
            color TEXT NOT NULL,
            icon TEXT NOT NULL,
            is_default INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            UNIQUE (user_id, id)
        );

        CREATE INDEX IF NOT EXISTS idx_category_user ON category(user_id);",
    )?;

    Ok(())
}

/// Retrieve all of a user's categories, seeding the starter set first if the
/// partition is empty.
///
/// Categories are ordered with the starter set first, then alphabetically by
/// name. Seeding and the subsequent read happen in one transaction, so two
/// first reads can never both seed.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn list_categories(user_id: UserID, connection: &Connection) -> Result<Vec<Category>, Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    seed_if_empty(user_id, &transaction)?;

    let categories = transaction
        .prepare(
            "SELECT user_id, id, name, color, icon, is_default, created_at
             FROM category WHERE user_id = :user_id
             ORDER BY is_default DESC, name COLLATE NOCASE ASC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row)?
        .collect::<Result<Vec<_>, _>>()?;

    transaction.commit()?;

    Ok(categories)
}

/// Retrieve a single category in a user's partition.
///
/// Seeds the starter set first if the partition is empty, so the starter
/// categories are visible by ID even before the first list call.
///
/// # Errors
/// Returns [Error::NotFound] if the ID is unknown to this user, including
/// when it exists in another user's partition.
pub fn get_category(id: i64, user_id: UserID, connection: &Connection) -> Result<Category, Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    seed_if_empty(user_id, &transaction)?;
    let category = lookup_category(id, user_id, &transaction)?;

    transaction.commit()?;

    Ok(category)
}

/// Create a category and return it with its assigned ID.
///
/// The ID is drawn from the user's category sequence and is strictly greater
/// than every ID previously assigned in the partition. Omitted color and icon
/// fall back to [FALLBACK_COLOR] and [FALLBACK_ICON].
///
/// # Errors
/// Returns [Error::DuplicateCategoryName] if the user already has a category
/// with this name, compared case-insensitively.
pub fn create_category(
    new_category: NewCategory,
    user_id: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    seed_if_empty(user_id, &transaction)?;
    reject_duplicate_name(&new_category.name, None, user_id, &transaction)?;

    let id = next_record_id(user_id.as_i64(), RecordKind::Category, &transaction)?;
    let created_at = OffsetDateTime::now_utc();
    let category = Category {
        id,
        user_id,
        name: new_category.name,
        color: new_category
            .color
            .unwrap_or_else(|| FALLBACK_COLOR.to_owned()),
        icon: new_category.icon.unwrap_or_else(|| FALLBACK_ICON.to_owned()),
        is_default: false,
        created_at,
    };

    transaction.execute(
        "INSERT INTO category (user_id, id, name, color, icon, is_default, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        (
            user_id.as_i64(),
            category.id,
            category.name.as_ref(),
            &category.color,
            &category.icon,
            category.is_default,
            category.created_at,
        ),
    )?;

    transaction.commit()?;
    tracing::debug!("created category {id} for user {user_id}");

    Ok(category)
}

/// Apply a partial update to a category's display fields.
///
/// The ID, owner, and default flag are immutable; renaming a starter category
/// is allowed and does not clear its default flag.
///
/// # Errors
/// Returns [Error::NotFound] if the ID is unknown to this user, or
/// [Error::DuplicateCategoryName] if the new name collides with another
/// category of the same user (the record being updated is excluded from the
/// check).
pub fn update_category(
    id: i64,
    update: CategoryUpdate,
    user_id: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    seed_if_empty(user_id, &transaction)?;
    let mut category = lookup_category(id, user_id, &transaction)?;

    if let Some(name) = update.name {
        reject_duplicate_name(&name, Some(id), user_id, &transaction)?;
        category.name = name;
    }
    if let Some(color) = update.color {
        category.color = color;
    }
    if let Some(icon) = update.icon {
        category.icon = icon;
    }

    transaction.execute(
        "UPDATE category SET name = ?1, color = ?2, icon = ?3 WHERE user_id = ?4 AND id = ?5",
        (
            category.name.as_ref(),
            &category.color,
            &category.icon,
            user_id.as_i64(),
            id,
        ),
    )?;

    transaction.commit()?;
    tracing::debug!("updated category {id} for user {user_id}");

    Ok(category)
}

/// Delete a category from a user's partition.
///
/// # Errors
/// - [Error::NotFound] if the ID is unknown to this user.
/// - [Error::DeleteDefaultCategory] if the category is one of the starter set.
/// - [Error::CategoryInUse] if any of the user's expenses reference it.
pub fn delete_category(id: i64, user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    seed_if_empty(user_id, &transaction)?;
    let category = lookup_category(id, user_id, &transaction)?;

    if category.is_default {
        return Err(Error::DeleteDefaultCategory);
    }

    let in_use: bool = transaction.query_row(
        "SELECT EXISTS (SELECT 1 FROM expense WHERE user_id = ?1 AND category_id = ?2)",
        (user_id.as_i64(), id),
        |row| row.get(0),
    )?;

    if in_use {
        return Err(Error::CategoryInUse);
    }

    transaction.execute(
        "DELETE FROM category WHERE user_id = ?1 AND id = ?2",
        (user_id.as_i64(), id),
    )?;

    transaction.commit()?;
    tracing::debug!("deleted category {id} for user {user_id}");

    Ok(())
}

/// Fetch a category without seeding. For use inside an open transaction.
pub(crate) fn lookup_category(
    id: i64,
    user_id: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(
            "SELECT user_id, id, name, color, icon, is_default, created_at
             FROM category WHERE user_id = :user_id AND id = :id",
        )?
        .query_row(
            &[(":user_id", &user_id.as_i64()), (":id", &id)],
            map_row,
        )
        .map_err(|error| error.into())
}

/// Seed the starter set if the user's partition is empty.
///
/// Must run inside an open transaction; the emptiness check and the inserts
/// are only atomic together.
pub(crate) fn seed_if_empty(user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let count: i64 = connection.query_row(
        "SELECT COUNT(*) FROM category WHERE user_id = ?1",
        (user_id.as_i64(),),
        |row| row.get(0),
    )?;

    if count > 0 {
        return Ok(());
    }

    let created_at = OffsetDateTime::now_utc();

    for starter in STARTER_CATEGORIES {
        let id = next_record_id(user_id.as_i64(), RecordKind::Category, connection)?;

        connection.execute(
            "INSERT INTO category (user_id, id, name, color, icon, is_default, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
            (
                user_id.as_i64(),
                id,
                starter.name,
                starter.color,
                starter.icon,
                created_at,
            ),
        )?;
    }

    tracing::debug!("seeded starter categories for user {user_id}");

    Ok(())
}

fn reject_duplicate_name(
    name: &CategoryName,
    excluding_id: Option<i64>,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let duplicate: bool = connection.query_row(
        "SELECT EXISTS (
            SELECT 1 FROM category
            WHERE user_id = ?1 AND name = ?2 COLLATE NOCASE AND id != ?3
        )",
        (user_id.as_i64(), name.as_ref(), excluding_id.unwrap_or(-1)),
        |row| row.get(0),
    )?;

    if duplicate {
        return Err(Error::DuplicateCategoryName(name.as_ref().to_owned()));
    }

    Ok(())
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let raw_user_id = row.get(0)?;
    let raw_name: String = row.get(2)?;

    Ok(Category {
        user_id: UserID::new(raw_user_id),
        id: row.get(1)?,
        name: CategoryName::new_unchecked(&raw_name),
        color: row.get(3)?,
        icon: row.get(4)?,
        is_default: row.get(5)?,
        created_at: row.get(6)?,
    })
}

#[cfg(test)]
mod category_query_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        category::{
            CategoryName, CategoryUpdate, FALLBACK_COLOR, FALLBACK_ICON, NewCategory,
            STARTER_CATEGORIES, create_category, delete_category, get_category, list_categories,
            update_category,
        },
        db::initialize,
        expense::{NewExpense, create_expense, delete_expense},
        password::PasswordHash,
        user::{UserID, create_user},
    };

    fn get_test_db_connection() -> (Connection, UserID) {
        let connection =
            Connection::open_in_memory().expect("Could not create in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");

        let user = create_user("alice", PasswordHash::new_unchecked("hunter2"), &connection)
            .expect("Could not create test user");

        (connection, user.id)
    }

    fn new_category(name: &str) -> NewCategory {
        NewCategory {
            name: CategoryName::new(name).unwrap(),
            color: None,
            icon: None,
        }
    }

    #[test]
    fn first_list_seeds_the_starter_set() {
        let (connection, user_id) = get_test_db_connection();

        let categories = list_categories(user_id, &connection).unwrap();

        assert_eq!(categories.len(), STARTER_CATEGORIES.len());
        assert!(categories.iter().all(|category| category.is_default));

        let mut ids: Vec<i64> = categories.iter().map(|category| category.id).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn second_list_does_not_seed_again() {
        let (connection, user_id) = get_test_db_connection();

        let first = list_categories(user_id, &connection).unwrap();
        let second = list_categories(user_id, &connection).unwrap();

        assert_eq!(first, second);
        assert_eq!(second.len(), STARTER_CATEGORIES.len());
    }

    #[test]
    fn seeded_values_match_the_starter_table() {
        let (connection, user_id) = get_test_db_connection();

        let categories = list_categories(user_id, &connection).unwrap();

        let food = categories
            .iter()
            .find(|category| category.name.as_ref() == "Food")
            .expect("Starter set should contain Food");
        assert_eq!(food.color, "#FFD6CC");
        assert_eq!(food.icon, "🍔");
    }

    #[test]
    fn list_orders_defaults_first_then_by_name() {
        let (connection, user_id) = get_test_db_connection();
        list_categories(user_id, &connection).unwrap();
        create_category(new_category("Books"), user_id, &connection).unwrap();
        create_category(new_category("archery"), user_id, &connection).unwrap();

        let categories = list_categories(user_id, &connection).unwrap();

        let names: Vec<&str> = categories
            .iter()
            .map(|category| category.name.as_ref())
            .collect();
        // Starter set first (alphabetical), then user categories (alphabetical,
        // case-insensitive).
        assert_eq!(
            names,
            vec![
                "Entertainment",
                "Food",
                "Misc",
                "Rent",
                "Shopping",
                "Transport",
                "Utilities",
                "archery",
                "Books",
            ]
        );
    }

    #[test]
    fn create_applies_fallback_color_and_icon() {
        let (connection, user_id) = get_test_db_connection();

        let category = create_category(new_category("Books"), user_id, &connection).unwrap();

        assert_eq!(category.color, FALLBACK_COLOR);
        assert_eq!(category.icon, FALLBACK_ICON);
        assert!(!category.is_default);
    }

    #[test]
    fn create_assigns_strictly_increasing_ids() {
        let (connection, user_id) = get_test_db_connection();

        let existing = list_categories(user_id, &connection).unwrap();
        let max_existing_id = existing.iter().map(|category| category.id).max().unwrap();

        let first = create_category(new_category("Books"), user_id, &connection).unwrap();
        let second = create_category(new_category("Garden"), user_id, &connection).unwrap();

        assert!(first.id > max_existing_id);
        assert!(second.id > first.id);
    }

    #[test]
    fn create_rejects_duplicate_name_case_insensitively() {
        let (connection, user_id) = get_test_db_connection();
        create_category(new_category("Books"), user_id, &connection).unwrap();

        let result = create_category(new_category("books"), user_id, &connection);

        assert_eq!(
            result,
            Err(Error::DuplicateCategoryName("books".to_owned()))
        );
    }

    #[test]
    fn create_rejects_names_clashing_with_the_starter_set() {
        let (connection, user_id) = get_test_db_connection();

        // The partition is seeded before the duplicate check even when the
        // user has never listed their categories.
        let result = create_category(new_category("food"), user_id, &connection);

        assert_eq!(result, Err(Error::DuplicateCategoryName("food".to_owned())));
    }

    #[test]
    fn duplicate_names_are_allowed_across_users() {
        let (connection, user_id) = get_test_db_connection();
        let other_user = create_user("bob", PasswordHash::new_unchecked("hunter3"), &connection)
            .expect("Could not create second user")
            .id;

        create_category(new_category("Books"), user_id, &connection).unwrap();
        let result = create_category(new_category("Books"), other_user, &connection);

        assert!(result.is_ok());
    }

    #[test]
    fn get_category_scopes_by_user() {
        let (connection, user_id) = get_test_db_connection();
        let other_user = create_user("bob", PasswordHash::new_unchecked("hunter3"), &connection)
            .expect("Could not create second user")
            .id;
        let category = create_category(new_category("Books"), user_id, &connection).unwrap();

        let result = get_category(category.id, other_user, &connection);

        // `other_user` has a seeded starter set, so the ID may exist in their
        // partition too; what matters is they never see `user_id`'s record.
        if let Ok(found) = result {
            assert_eq!(found.user_id, other_user);
        }
        assert_eq!(
            get_category(category.id, user_id, &connection).unwrap(),
            category
        );
    }

    #[test]
    fn get_category_with_unknown_id_returns_not_found() {
        let (connection, user_id) = get_test_db_connection();

        let result = get_category(999, user_id, &connection);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn update_changes_only_provided_fields() {
        let (connection, user_id) = get_test_db_connection();
        let category = create_category(new_category("Books"), user_id, &connection).unwrap();

        let updated = update_category(
            category.id,
            CategoryUpdate {
                name: None,
                color: Some("#123456".to_owned()),
                icon: None,
            },
            user_id,
            &connection,
        )
        .unwrap();

        assert_eq!(updated.name, category.name);
        assert_eq!(updated.color, "#123456");
        assert_eq!(updated.icon, category.icon);

        let reloaded = get_category(category.id, user_id, &connection).unwrap();
        assert_eq!(reloaded, updated);
    }

    #[test]
    fn update_rejects_duplicate_name_excluding_self() {
        let (connection, user_id) = get_test_db_connection();
        create_category(new_category("Books"), user_id, &connection).unwrap();
        let garden = create_category(new_category("Garden"), user_id, &connection).unwrap();

        // Renaming to its own name (any case) is fine.
        let same_name = update_category(
            garden.id,
            CategoryUpdate {
                name: Some(CategoryName::new("garden").unwrap()),
                ..Default::default()
            },
            user_id,
            &connection,
        );
        assert!(same_name.is_ok());

        // Renaming onto another category is not.
        let clash = update_category(
            garden.id,
            CategoryUpdate {
                name: Some(CategoryName::new("BOOKS").unwrap()),
                ..Default::default()
            },
            user_id,
            &connection,
        );
        assert_eq!(
            clash,
            Err(Error::DuplicateCategoryName("BOOKS".to_owned()))
        );
    }

    #[test]
    fn update_with_unknown_id_returns_not_found() {
        let (connection, user_id) = get_test_db_connection();

        let result = update_category(999, CategoryUpdate::default(), user_id, &connection);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn delete_default_category_is_rejected() {
        let (connection, user_id) = get_test_db_connection();
        let categories = list_categories(user_id, &connection).unwrap();
        let default_category = categories.iter().find(|category| category.is_default).unwrap();

        let result = delete_category(default_category.id, user_id, &connection);

        assert_eq!(result, Err(Error::DeleteDefaultCategory));
    }

    #[test]
    fn delete_referenced_category_is_rejected_until_expenses_removed() {
        let (connection, user_id) = get_test_db_connection();
        let category = create_category(new_category("Books"), user_id, &connection).unwrap();
        let expense = create_expense(
            NewExpense::new(
                9.99,
                time::macros::date!(2024 - 01 - 15),
                category.id,
                None,
            )
            .unwrap(),
            user_id,
            &connection,
        )
        .unwrap();

        let blocked = delete_category(category.id, user_id, &connection);
        assert_eq!(blocked, Err(Error::CategoryInUse));

        delete_expense(expense.id, user_id, &connection).unwrap();

        let result = delete_category(category.id, user_id, &connection);
        assert!(result.is_ok());
        assert_eq!(
            get_category(category.id, user_id, &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn delete_with_unknown_id_returns_not_found() {
        let (connection, user_id) = get_test_db_connection();

        let result = delete_category(999, user_id, &connection);

        assert_eq!(result, Err(Error::NotFound));
    }
}
