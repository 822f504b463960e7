//! Spending reports: aggregated views over a date range of expenses.
//!
//! The types here serialize with camelCase field names, matching the JSON
//! shape consumed by the web frontend.

mod aggregation;

use serde::Serialize;
use time::Date;

use crate::category::Category;

pub use aggregation::build_report;

/// An aggregated view of one user's spending over a date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// The sum of all expense amounts in the range.
    pub total_expenses: f64,
    /// Per-category totals, largest first.
    pub category_breakdown: Vec<CategoryBreakdown>,
    /// Per-day totals in ascending date order. Days without expenses are
    /// omitted.
    pub daily_trends: Vec<DailyTotal>,
    /// Per-week totals in ascending order of the week's starting Monday.
    pub weekly_trends: Vec<WeeklyTotal>,
    /// Per-month totals in ascending `YYYY-MM` order.
    pub monthly_trends: Vec<MonthlyTotal>,
    /// The day with the highest total. Ties go to the earliest such day; an
    /// empty range reports the range's start date with a zero total.
    pub highest_spending_day: DailyTotal,
    /// The category with the highest total, or a zero-total placeholder when
    /// the range holds no expenses.
    pub top_category: TopCategory,
}

/// One category's share of the spending in a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBreakdown {
    /// The category the expenses belong to.
    pub category: Category,
    /// The summed amount for this category.
    pub total: f64,
    /// This category's share of the report total, as a percentage.
    pub percentage: f64,
}

/// The total spent on a single day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTotal {
    /// The day the expenses fall on.
    pub date: Date,
    /// The summed amount for the day.
    pub total: f64,
}

/// The total spent in one week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyTotal {
    /// The Monday beginning the week.
    pub week: Date,
    /// The summed amount for the week.
    pub total: f64,
}

/// The total spent in one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotal {
    /// The month in `YYYY-MM` form.
    pub month: String,
    /// The summed amount for the month.
    pub total: f64,
}

/// The highest-spending category in a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopCategory {
    /// The category, or `None` when the report covers no expenses.
    pub category: Option<Category>,
    /// The summed amount for the category.
    pub total: f64,
}
