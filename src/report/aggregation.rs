//! Turns a range-filtered expense set into a [Report].
//!
//! Aggregation is pure: it takes the already-fetched expenses and the owning
//! user's categories and performs no I/O, so it can be tested without a
//! database.

use std::collections::HashMap;

use time::Date;

use crate::{
    category::Category,
    expense::Expense,
    range::{DateRange, week_start},
    report::{CategoryBreakdown, DailyTotal, MonthlyTotal, Report, TopCategory, WeeklyTotal},
};

/// Build a spending report from the expenses within `range`.
///
/// `expenses` must already be filtered to the range; `categories` is the
/// owning user's full category list. Expenses referencing a category missing
/// from `categories` cannot occur through the store (category deletion is
/// blocked while expenses reference it) and are skipped from the breakdown
/// with a warning.
///
/// With no expenses, every collection is empty, the highest spending day
/// falls back to `range.start` with a zero total, and the top category is
/// `None`.
pub fn build_report(range: DateRange, expenses: &[Expense], categories: &[Category]) -> Report {
    if expenses.is_empty() {
        return Report {
            total_expenses: 0.0,
            category_breakdown: Vec::new(),
            daily_trends: Vec::new(),
            weekly_trends: Vec::new(),
            monthly_trends: Vec::new(),
            highest_spending_day: DailyTotal {
                date: range.start,
                total: 0.0,
            },
            top_category: TopCategory {
                category: None,
                total: 0.0,
            },
        };
    }

    let total_expenses: f64 = expenses.iter().map(|expense| expense.amount).sum();

    let category_breakdown = build_category_breakdown(expenses, categories, total_expenses);
    let daily_trends = build_daily_trends(expenses);
    let weekly_trends = build_weekly_trends(expenses);
    let monthly_trends = build_monthly_trends(expenses);

    // `daily_trends` is ascending and the comparison is strict, so ties go to
    // the earliest day. Amounts are positive, so any day beats the fallback.
    let mut highest_spending_day = DailyTotal {
        date: range.start,
        total: 0.0,
    };
    for day in &daily_trends {
        if day.total > highest_spending_day.total {
            highest_spending_day = day.clone();
        }
    }

    let top_category = match category_breakdown.first() {
        Some(breakdown) => TopCategory {
            category: Some(breakdown.category.clone()),
            total: breakdown.total,
        },
        None => TopCategory {
            category: None,
            total: 0.0,
        },
    };

    Report {
        total_expenses,
        category_breakdown,
        daily_trends,
        weekly_trends,
        monthly_trends,
        highest_spending_day,
        top_category,
    }
}

fn build_category_breakdown(
    expenses: &[Expense],
    categories: &[Category],
    total_expenses: f64,
) -> Vec<CategoryBreakdown> {
    let categories_by_id: HashMap<i64, &Category> = categories
        .iter()
        .map(|category| (category.id, category))
        .collect();

    let mut totals: HashMap<i64, f64> = HashMap::new();
    for expense in expenses {
        *totals.entry(expense.category_id).or_default() += expense.amount;
    }

    let mut breakdown: Vec<CategoryBreakdown> = totals
        .into_iter()
        .filter_map(|(category_id, total)| match categories_by_id.get(&category_id) {
            Some(&category) => Some(CategoryBreakdown {
                category: category.clone(),
                total,
                percentage: total / total_expenses * 100.0,
            }),
            None => {
                tracing::warn!("expense references unknown category {category_id}, skipping");
                None
            }
        })
        .collect();

    breakdown.sort_by(|a, b| b.total.total_cmp(&a.total));

    breakdown
}

fn build_daily_trends(expenses: &[Expense]) -> Vec<DailyTotal> {
    let mut totals: HashMap<Date, f64> = HashMap::new();
    for expense in expenses {
        *totals.entry(expense.date).or_default() += expense.amount;
    }

    let mut daily_trends: Vec<DailyTotal> = totals
        .into_iter()
        .map(|(date, total)| DailyTotal { date, total })
        .collect();
    daily_trends.sort_by_key(|day| day.date);

    daily_trends
}

fn build_weekly_trends(expenses: &[Expense]) -> Vec<WeeklyTotal> {
    let mut totals: HashMap<Date, f64> = HashMap::new();
    for expense in expenses {
        *totals.entry(week_start(expense.date)).or_default() += expense.amount;
    }

    let mut weekly_trends: Vec<WeeklyTotal> = totals
        .into_iter()
        .map(|(week, total)| WeeklyTotal { week, total })
        .collect();
    weekly_trends.sort_by_key(|week| week.week);

    weekly_trends
}

fn build_monthly_trends(expenses: &[Expense]) -> Vec<MonthlyTotal> {
    let mut totals: HashMap<String, f64> = HashMap::new();
    for expense in expenses {
        *totals.entry(month_key(expense.date)).or_default() += expense.amount;
    }

    let mut monthly_trends: Vec<MonthlyTotal> = totals
        .into_iter()
        .map(|(month, total)| MonthlyTotal { month, total })
        .collect();
    monthly_trends.sort_by(|a, b| a.month.cmp(&b.month));

    monthly_trends
}

/// The `YYYY-MM` key for a date, e.g. 2024-01-15 maps to "2024-01".
fn month_key(date: Date) -> String {
    format!("{:04}-{:02}", date.year(), u8::from(date.month()))
}
