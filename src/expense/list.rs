//! Searching, filtering and grouping for the expense list.

use std::{cmp::Reverse, collections::BTreeMap};

use time::Date;

use crate::{Expense, ExpenseCategory};

/// The search box and category selector of the expense list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseFilter {
    /// Text to look for in the title, location or notes, ignoring case.
    pub search: String,
    /// Only show this category, or every category if `None`.
    pub category: Option<ExpenseCategory>,
}

impl ExpenseFilter {
    /// Whether `expense` should be shown.
    pub fn matches(&self, expense: &Expense) -> bool {
        let needle = self.search.trim().to_lowercase();

        let matches_search = needle.is_empty()
            || expense.title.to_lowercase().contains(&needle)
            || expense.location.to_lowercase().contains(&needle)
            || expense
                .notes
                .as_ref()
                .is_some_and(|notes| notes.to_lowercase().contains(&needle));

        let matches_category = self
            .category
            .is_none_or(|category| expense.category == category);

        matches_search && matches_category
    }

    /// The expenses that match the filter, in their original order.
    pub fn apply<'a>(&self, expenses: &'a [Expense]) -> Vec<&'a Expense> {
        expenses
            .iter()
            .filter(|expense| self.matches(expense))
            .collect()
    }
}

/// Group expenses by the calendar day they were spent, most recent day first.
///
/// Expenses with an unknown date are grouped under `None`, which comes last.
pub fn group_by_date<'a, I>(expenses: I) -> Vec<(Option<Date>, Vec<&'a Expense>)>
where
    I: IntoIterator<Item = &'a Expense>,
{
    let mut groups: BTreeMap<Reverse<Date>, Vec<&Expense>> = BTreeMap::new();
    let mut undated = Vec::new();

    for expense in expenses {
        match expense.date.date() {
            Some(date) => groups.entry(Reverse(date)).or_default().push(expense),
            None => undated.push(expense),
        }
    }

    let mut grouped: Vec<_> = groups
        .into_iter()
        .map(|(Reverse(date), expenses)| (Some(date), expenses))
        .collect();

    if !undated.is_empty() {
        grouped.push((None, undated));
    }

    grouped
}

/// The `count` most recent expenses, newest first.
pub fn recent_expenses(expenses: &[Expense], count: usize) -> Vec<&Expense> {
    let mut recent: Vec<&Expense> = expenses.iter().collect();
    recent.sort_by_key(|expense| (expense.date.is_unknown(), Reverse(expense.date.date())));
    recent.truncate(count);
    recent
}

#[cfg(test)]
mod expense_list_tests {
    use time::{Date, UtcOffset, macros::date};

    use crate::{
        Expense, ExpenseCategory, ExpenseFilter, ExpenseId, FamilyId, Timestamp, UserId,
        group_by_date, recent_expenses,
    };

    fn expense(id: &str, title: &str, category: ExpenseCategory, date: Option<Date>) -> Expense {
        Expense {
            id: ExpenseId::new(id),
            title: title.to_owned(),
            amount: 10.0,
            category,
            date: date
                .map(|date| Timestamp::from_date(date, UtcOffset::UTC))
                .unwrap_or(Timestamp::Unknown),
            location: "Corner store".to_owned(),
            notes: Some("Paid with cash".to_owned()),
            user_id: UserId::new("alice"),
            family_id: FamilyId::new("smiths"),
            created_at: Timestamp::Unknown,
            updated_at: Timestamp::Unknown,
        }
    }

    #[test]
    fn search_matches_title_location_and_notes_ignoring_case() {
        let expense = expense(
            "1",
            "Weekly Groceries",
            ExpenseCategory::Food,
            Some(date!(2024 - 03 - 01)),
        );

        for search in ["groceries", "CORNER", "cash", ""] {
            let filter = ExpenseFilter {
                search: search.to_owned(),
                category: None,
            };
            assert!(filter.matches(&expense), "'{search}' should match");
        }

        let filter = ExpenseFilter {
            search: "petrol".to_owned(),
            category: None,
        };
        assert!(!filter.matches(&expense));
    }

    #[test]
    fn category_filter_excludes_other_categories() {
        let expenses = vec![
            expense("1", "Bread", ExpenseCategory::Food, Some(date!(2024 - 03 - 01))),
            expense("2", "Bus", ExpenseCategory::Transportation, Some(date!(2024 - 03 - 01))),
        ];
        let filter = ExpenseFilter {
            search: String::new(),
            category: Some(ExpenseCategory::Transportation),
        };

        let shown = filter.apply(&expenses);

        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].id, ExpenseId::new("2"));
    }

    #[test]
    fn groups_by_day_newest_first_with_unknown_dates_last() {
        let expenses = vec![
            expense("1", "Bread", ExpenseCategory::Food, Some(date!(2024 - 03 - 01))),
            expense("2", "Mystery", ExpenseCategory::Miscellaneous, None),
            expense("3", "Bus", ExpenseCategory::Transportation, Some(date!(2024 - 03 - 02))),
            expense("4", "Milk", ExpenseCategory::Food, Some(date!(2024 - 03 - 01))),
        ];

        let groups = group_by_date(&expenses);

        let days: Vec<_> = groups.iter().map(|(date, _)| *date).collect();
        assert_eq!(
            days,
            vec![Some(date!(2024 - 03 - 02)), Some(date!(2024 - 03 - 01)), None]
        );
        assert_eq!(groups[1].1.len(), 2);
    }

    #[test]
    fn recent_expenses_are_newest_first_and_limited() {
        let expenses = vec![
            expense("1", "Old", ExpenseCategory::Food, Some(date!(2024 - 01 - 01))),
            expense("2", "Undated", ExpenseCategory::Food, None),
            expense("3", "New", ExpenseCategory::Food, Some(date!(2024 - 03 - 01))),
            expense("4", "Middle", ExpenseCategory::Food, Some(date!(2024 - 02 - 01))),
        ];

        let recent = recent_expenses(&expenses, 3);

        let ids: Vec<_> = recent.iter().map(|expense| expense.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "4", "1"]);
    }
}
