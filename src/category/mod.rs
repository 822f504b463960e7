//! Expense categories: the model, the per-user starter set, and database
//! operations.
//!
//! Every category belongs to exactly one user. A fixed starter set of seven
//! categories is materialized the first time a user's category list is read
//! and found empty; these carry the default flag and cannot be deleted.

mod db;

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, user::UserID};

pub use db::{
    create_category, create_category_table, delete_category, get_category, list_categories,
    update_category,
};
pub(crate) use db::{lookup_category, seed_if_empty};

/// The color applied when a category is created without one.
pub const FALLBACK_COLOR: &str = "#D4A574";

/// The icon applied when a category is created without one.
pub const FALLBACK_ICON: &str = "💰";

/// A starter category template seeded into every new user's partition.
#[derive(Debug, Clone, Copy)]
pub struct StarterCategory {
    /// The category's display name.
    pub name: &'static str,
    /// The category's display color.
    pub color: &'static str,
    /// The category's icon.
    pub icon: &'static str,
}

/// The fixed starter set seeded on a user's first category read.
///
/// The values (and their order, which determines the seeded IDs 1 through 7)
/// are part of the external contract and must not change.
pub const STARTER_CATEGORIES: [StarterCategory; 7] = [
    StarterCategory {
        name: "Food",
        color: "#FFD6CC",
        icon: "🍔",
    },
    StarterCategory {
        name: "Transport",
        color: "#B3E5FC",
        icon: "🚗",
    },
    StarterCategory {
        name: "Rent",
        color: "#C8E6C9",
        icon: "🏠",
    },
    StarterCategory {
        name: "Shopping",
        color: "#F8BBD0",
        icon: "🛍️",
    },
    StarterCategory {
        name: "Entertainment",
        color: "#FFE5B4",
        icon: "🎬",
    },
    StarterCategory {
        name: "Utilities",
        color: "#D4A574",
        icon: "💡",
    },
    StarterCategory {
        name: "Misc",
        color: "#E1BEE7",
        icon: "📦",
    },
];

/// The name of a category.
///
/// Guaranteed trimmed and non-empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name, trimming surrounding whitespace.
    ///
    /// # Errors
    /// This function will return an error if `name` is empty or contains only
    /// whitespace.
    pub fn new(name: &str) -> Result<Self, Error> {
        let trimmed = name.trim();

        if trimmed.is_empty() {
            Err(Error::EmptyCategoryName)
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is trimmed and not empty.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because
    /// if the non-empty invariant is violated it will cause incorrect
    /// behaviour but not affect memory safety.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
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

/// A category for expenses, e.g., 'Groceries', 'Eating Out'.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// The category's ID, unique within the owning user's partition.
    pub id: i64,
    /// The ID of the owning user.
    pub user_id: UserID,
    /// The category's display name, unique (case-insensitively) within the
    /// owning user's partition.
    pub name: CategoryName,
    /// The category's display color as a hex string.
    pub color: String,
    /// The category's icon.
    pub icon: String,
    /// Whether this is one of the seeded starter categories. Default
    /// categories cannot be deleted.
    pub is_default: bool,
    /// When the category was created.
    pub created_at: OffsetDateTime,
}

/// The fields accepted when creating a category.
///
/// Color and icon fall back to [FALLBACK_COLOR] and [FALLBACK_ICON] when
/// omitted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewCategory {
    /// The category's display name.
    pub name: CategoryName,
    /// The category's display color, or `None` for the fallback.
    pub color: Option<String>,
    /// The category's icon, or `None` for the fallback.
    pub icon: Option<String>,
}

/// A partial update to a category's display fields.
///
/// `None` fields are left unchanged. The ID, owner, and default flag are
/// immutable.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CategoryUpdate {
    /// The new display name, if changing.
    pub name: Option<CategoryName>,
    /// The new display color, if changing.
    pub color: Option<String>,
    /// The new icon, if changing.
    pub icon: Option<String>,
}
