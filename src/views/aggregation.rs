//! Totals and breakdowns of expenses over a timeframe.

use std::collections::BTreeMap;

use serde::Serialize;
use time::Date;

use crate::{
    Expense, ExpenseCategory, UserId,
    views::{DateRange, Timeframe, timeframe_range},
};

/// An amount attributed to one group, e.g. a category, and its share of the total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupShare<K> {
    /// The group the amount belongs to.
    pub key: K,
    /// The sum of the group's expenses.
    pub amount: f64,
    /// The group's share of the total as a percentage in `[0, 100]`.
    pub percentage: f64,
}

/// The expenses dated within `range`. Expenses with an unknown date are never included.
pub fn expenses_in_range(expenses: &[Expense], range: DateRange) -> Vec<&Expense> {
    expenses
        .iter()
        .filter(|expense| expense.date.date().is_some_and(|date| range.contains(date)))
        .collect()
}

/// The sum of the amounts of `expenses`.
pub fn total_amount<'a>(expenses: impl IntoIterator<Item = &'a Expense>) -> f64 {
    expenses.into_iter().map(|expense| expense.amount).sum()
}

/// `amount` as a percentage of `total`, zero if `total` is zero.
pub fn share(amount: f64, total: f64) -> f64 {
    if total == 0.0 {
        0.0
    } else {
        amount / total * 100.0
    }
}

/// Sum amounts per key, dropping zero totals and sorting by amount, largest first.
///
/// Groups with equal amounts are ordered by key.
fn group_by<K: Ord + Clone>(
    expenses: &[&Expense],
    key: impl Fn(&Expense) -> K,
) -> Vec<GroupShare<K>> {
    let mut totals: BTreeMap<K, f64> = BTreeMap::new();

    for expense in expenses {
        *totals.entry(key(expense)).or_insert(0.0) += expense.amount;
    }

    let total: f64 = totals.values().sum();

    let mut groups: Vec<GroupShare<K>> = totals
        .into_iter()
        .filter(|(_, amount)| *amount != 0.0)
        .map(|(key, amount)| GroupShare {
            key,
            amount,
            percentage: share(amount, total),
        })
        .collect();

    // sort_by is stable, so ties keep the key order from the map.
    groups.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    groups
}

/// Spending per category, ties in category declaration order.
pub fn by_category(expenses: &[&Expense]) -> Vec<GroupShare<ExpenseCategory>> {
    group_by(expenses, |expense| expense.category)
}

/// Spending per member, ties ordered by user ID.
pub fn by_user(expenses: &[&Expense]) -> Vec<GroupShare<UserId>> {
    group_by(expenses, |expense| expense.user_id.clone())
}

/// A summary of spending over one timeframe.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeframeReport {
    /// The kind of period covered.
    pub timeframe: Timeframe,
    /// The days covered.
    pub range: DateRange,
    /// The number of expenses in the period.
    pub count: usize,
    /// The total spent in the period.
    pub total: f64,
    /// Spending per category.
    pub categories: Vec<GroupShare<ExpenseCategory>>,
    /// Spending per member.
    pub members: Vec<GroupShare<UserId>>,
}

impl TimeframeReport {
    /// Summarize the `expenses` in the `timeframe` containing `today`.
    pub fn new(expenses: &[Expense], timeframe: Timeframe, today: Date) -> Self {
        let range = timeframe_range(timeframe, today);
        let in_range = expenses_in_range(expenses, range);

        Self {
            timeframe,
            range,
            count: in_range.len(),
            total: total_amount(in_range.iter().copied()),
            categories: by_category(&in_range),
            members: by_user(&in_range),
        }
    }
}
