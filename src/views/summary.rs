//! The figures shown at the top of the dashboard.

use serde::Serialize;
use time::{Date, Duration};

use crate::{
    Expense,
    views::{Timeframe, expenses_in_range, timeframe_range, total_amount},
};

/// All-time, daily and monthly spending.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    /// The total of every expense.
    pub total: f64,
    /// The total spent today.
    pub today: f64,
    /// The total spent in the current calendar month.
    pub this_month: f64,
    /// The total spent in the previous calendar month.
    pub last_month: f64,
    /// The change from last month to this month as a percentage, zero if nothing was spent last
    /// month.
    pub month_change_percent: f64,
}

impl DashboardSummary {
    /// Summarize `expenses` as of `today`.
    pub fn new(expenses: &[Expense], today: Date) -> Self {
        let this_month_range = timeframe_range(Timeframe::Month, today);
        let last_month_range =
            timeframe_range(Timeframe::Month, this_month_range.start - Duration::days(1));

        let today_total = total_amount(
            expenses
                .iter()
                .filter(|expense| expense.date.date() == Some(today)),
        );
        let this_month = total_amount(expenses_in_range(expenses, this_month_range));
        let last_month = total_amount(expenses_in_range(expenses, last_month_range));

        let month_change_percent = if last_month == 0.0 {
            0.0
        } else {
            (this_month - last_month) / last_month * 100.0
        };

        Self {
            total: total_amount(expenses),
            today: today_total,
            this_month,
            last_month,
            month_change_percent,
        }
    }
}
