//! The [Store] handle that owns the database connection.
//!
//! SQLite connections are not `Sync`, so the store wraps one connection in an
//! `Arc<Mutex<_>>` and every operation takes the lock for its full duration.
//! Multi-statement operations therefore never interleave, and the handle is
//! cheap to clone into whatever concurrent context the caller runs in.

use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use rusqlite::Connection;

use crate::{
    Error, category, db, expense, migrate,
    category::{Category, CategoryUpdate, NewCategory},
    expense::{Expense, NewExpense},
    migrate::MigrationSummary,
    password::PasswordHash,
    range::DateRange,
    report::{self, Report},
    user::{self, User, UserID},
};

/// A cloneable handle to the expense tracker's database.
#[derive(Debug, Clone)]
pub struct Store {
    connection: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (creating if necessary) the database at `path` and ensure the
    /// schema exists.
    ///
    /// # Errors
    /// This function will return an error if the file could not be opened as
    /// a SQLite database or the schema could not be created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let connection = Connection::open(path)?;
        db::initialize(&connection)?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Open an in-memory database with the schema created.
    ///
    /// Each call returns an independent, empty database.
    ///
    /// # Errors
    /// This function will return an error if the schema could not be created.
    pub fn open_in_memory() -> Result<Self, Error> {
        let connection = Connection::open_in_memory()?;
        db::initialize(&connection)?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLock
        })
    }

    /// Register a user. See [user::create_user].
    pub fn create_user(&self, username: &str, password_hash: PasswordHash) -> Result<User, Error> {
        user::create_user(username, password_hash, &*self.lock()?)
    }

    /// Fetch a user by ID. See [user::get_user_by_id].
    pub fn get_user(&self, user_id: UserID) -> Result<User, Error> {
        user::get_user_by_id(user_id, &*self.lock()?)
    }

    /// Fetch a user by username, compared case-insensitively. See
    /// [user::get_user_by_username].
    pub fn get_user_by_username(&self, username: &str) -> Result<User, Error> {
        user::get_user_by_username(username, &*self.lock()?)
    }

    /// List a user's categories, seeding the starter set on first read. See
    /// [category::list_categories].
    pub fn list_categories(&self, user_id: UserID) -> Result<Vec<Category>, Error> {
        category::list_categories(user_id, &*self.lock()?)
    }

    /// Fetch one of a user's categories. See [category::get_category].
    pub fn get_category(&self, id: i64, user_id: UserID) -> Result<Category, Error> {
        category::get_category(id, user_id, &*self.lock()?)
    }

    /// Create a category for a user. See [category::create_category].
    pub fn create_category(
        &self,
        new_category: NewCategory,
        user_id: UserID,
    ) -> Result<Category, Error> {
        category::create_category(new_category, user_id, &*self.lock()?)
    }

    /// Update one of a user's categories. See [category::update_category].
    pub fn update_category(
        &self,
        id: i64,
        update: CategoryUpdate,
        user_id: UserID,
    ) -> Result<Category, Error> {
        category::update_category(id, update, user_id, &*self.lock()?)
    }

    /// Delete one of a user's categories. See [category::delete_category].
    pub fn delete_category(&self, id: i64, user_id: UserID) -> Result<(), Error> {
        category::delete_category(id, user_id, &*self.lock()?)
    }

    /// List a user's expenses, optionally within a date range. See
    /// [expense::list_expenses].
    pub fn list_expenses(
        &self,
        user_id: UserID,
        range: Option<DateRange>,
    ) -> Result<Vec<Expense>, Error> {
        expense::list_expenses(user_id, range, &*self.lock()?)
    }

    /// Fetch one of a user's expenses. See [expense::get_expense].
    pub fn get_expense(&self, id: i64, user_id: UserID) -> Result<Expense, Error> {
        expense::get_expense(id, user_id, &*self.lock()?)
    }

    /// Create an expense for a user. See [expense::create_expense].
    pub fn create_expense(
        &self,
        new_expense: NewExpense,
        user_id: UserID,
    ) -> Result<Expense, Error> {
        expense::create_expense(new_expense, user_id, &*self.lock()?)
    }

    /// Replace one of a user's expenses. See [expense::update_expense].
    pub fn update_expense(
        &self,
        id: i64,
        fields: NewExpense,
        user_id: UserID,
    ) -> Result<Expense, Error> {
        expense::update_expense(id, fields, user_id, &*self.lock()?)
    }

    /// Delete one of a user's expenses. See [expense::delete_expense].
    pub fn delete_expense(&self, id: i64, user_id: UserID) -> Result<(), Error> {
        expense::delete_expense(id, user_id, &*self.lock()?)
    }

    /// Build a spending report over `range` for a user.
    ///
    /// Fetches the range's expenses and the user's categories under one lock
    /// acquisition, then aggregates with [report::build_report]. The returned
    /// report is a value; it does not change when the store does.
    pub fn report(&self, user_id: UserID, range: DateRange) -> Result<Report, Error> {
        let (expenses, categories) = {
            let connection = self.lock()?;
            let expenses = expense::list_expenses(user_id, Some(range), &connection)?;
            let categories = category::list_categories(user_id, &connection)?;

            (expenses, categories)
        };

        Ok(report::build_report(range, &expenses, &categories))
    }

    /// Assign ownerless legacy records to a user. See
    /// [migrate::migrate_ownerless].
    pub fn migrate_ownerless(&self, user_id: UserID) -> Result<MigrationSummary, Error> {
        migrate::migrate_ownerless(user_id, &*self.lock()?)
    }
}

#[cfg(test)]
mod store_tests {
    use time::macros::date;

    use crate::{
        Error,
        category::{CategoryName, NewCategory},
        expense::NewExpense,
        password::PasswordHash,
        range::DateRange,
        store::Store,
    };

    fn get_test_store() -> (Store, crate::user::UserID) {
        let store = Store::open_in_memory().expect("Could not create in-memory store");
        let user = store
            .create_user("alice", PasswordHash::new_unchecked("hunter2"))
            .expect("Could not create test user");

        (store, user.id)
    }

    #[test]
    fn open_creates_the_database_file() {
        let directory = tempfile::tempdir().expect("Could not create temp dir");
        let db_path = directory.path().join("spendbook.db");

        let store = Store::open(&db_path).expect("Could not open store");
        store
            .create_user("alice", PasswordHash::new_unchecked("hunter2"))
            .expect("Could not create user in on-disk store");

        assert!(db_path.exists());

        // A fresh handle over the same file sees the data.
        let reopened = Store::open(&db_path).expect("Could not reopen store");
        let user = reopened
            .get_user_by_username("alice")
            .expect("User should survive reopening");
        assert_eq!(user.username, "alice");
    }

    #[test]
    fn cloned_handles_share_state() {
        let (store, user_id) = get_test_store();
        let clone = store.clone();

        let category = store
            .create_category(
                NewCategory {
                    name: CategoryName::new("Books").unwrap(),
                    color: None,
                    icon: None,
                },
                user_id,
            )
            .unwrap();

        assert_eq!(clone.get_category(category.id, user_id), Ok(category));
    }

    #[test]
    fn report_covers_only_the_requested_range() {
        let (store, user_id) = get_test_store();
        let categories = store.list_categories(user_id).unwrap();
        let category_id = categories[0].id;

        for (amount, date) in [
            (10.0, date!(2024 - 01 - 05)),
            (20.0, date!(2024 - 01 - 25)),
            (40.0, date!(2024 - 02 - 05)),
        ] {
            store
                .create_expense(
                    NewExpense::new(amount, date, category_id, None).unwrap(),
                    user_id,
                )
                .unwrap();
        }

        let report = store
            .report(
                user_id,
                DateRange::new(date!(2024 - 01 - 01), date!(2024 - 01 - 31)),
            )
            .unwrap();

        assert_eq!(report.total_expenses, 30.0);
        assert_eq!(report.daily_trends.len(), 2);
    }

    #[test]
    fn report_on_a_fresh_user_is_empty_but_seeds_categories() {
        let (store, user_id) = get_test_store();
        let range = DateRange::new(date!(2024 - 01 - 01), date!(2024 - 01 - 31));

        let report = store.report(user_id, range).unwrap();

        assert_eq!(report.total_expenses, 0.0);
        assert_eq!(report.top_category.category, None);
        assert_eq!(report.highest_spending_day.date, range.start);

        let categories = store.list_categories(user_id).unwrap();
        assert_eq!(categories.len(), 7);
    }

    #[test]
    fn store_errors_surface_unchanged() {
        let (store, user_id) = get_test_store();

        let result = store.create_expense(
            NewExpense::new(5.0, date!(2024 - 01 - 15), 999, None).unwrap(),
            user_id,
        );

        assert_eq!(result, Err(Error::InvalidCategory));
    }
}
