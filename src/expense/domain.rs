//! Core expense domain types.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{FamilyId, Timestamp, UserId};

/// The document ID of an expense.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub struct ExpenseId(String);

impl ExpenseId {
    /// Create a new expense ID.
    pub fn new(id: &str) -> Self {
        Self(id.to_owned())
    }

    /// The ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ExpenseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// What an expense was spent on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ExpenseCategory {
    /// Groceries, restaurants and coffee.
    Food,
    /// Rent, mortgage and repairs.
    Housing,
    /// Fuel, fares and parking.
    Transportation,
    /// Movies, music and games.
    Entertainment,
    /// Power, water and internet.
    Utilities,
    /// Doctors and pharmacies.
    Healthcare,
    /// Tuition, books and courses.
    Education,
    /// Clothes and household goods.
    Shopping,
    /// Flights and accommodation.
    Travel,
    /// Personal care.
    Personal,
    /// Anything else.
    Miscellaneous,
}

impl ExpenseCategory {
    /// All categories in declaration order.
    pub const ALL: [ExpenseCategory; 11] = [
        ExpenseCategory::Food,
        ExpenseCategory::Housing,
        ExpenseCategory::Transportation,
        ExpenseCategory::Entertainment,
        ExpenseCategory::Utilities,
        ExpenseCategory::Healthcare,
        ExpenseCategory::Education,
        ExpenseCategory::Shopping,
        ExpenseCategory::Travel,
        ExpenseCategory::Personal,
        ExpenseCategory::Miscellaneous,
    ];

    /// The category's display name, which is also how it is stored remotely.
    pub fn label(self) -> &'static str {
        match self {
            ExpenseCategory::Food => "Food",
            ExpenseCategory::Housing => "Housing",
            ExpenseCategory::Transportation => "Transportation",
            ExpenseCategory::Entertainment => "Entertainment",
            ExpenseCategory::Utilities => "Utilities",
            ExpenseCategory::Healthcare => "Healthcare",
            ExpenseCategory::Education => "Education",
            ExpenseCategory::Shopping => "Shopping",
            ExpenseCategory::Travel => "Travel",
            ExpenseCategory::Personal => "Personal",
            ExpenseCategory::Miscellaneous => "Miscellaneous",
        }
    }
}

impl Display for ExpenseCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ExpenseCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExpenseCategory::ALL
            .into_iter()
            .find(|category| category.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown expense category \"{s}\""))
    }
}

/// Money spent by a family member.
///
/// Expenses read from the remote store always have an amount greater than zero and belong to
/// exactly one family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    /// The ID of the expense document.
    pub id: ExpenseId,
    /// A short description of what was bought.
    pub title: String,
    /// The amount spent in the family's currency.
    pub amount: f64,
    /// What the money was spent on.
    pub category: ExpenseCategory,
    /// When the money was spent.
    pub date: Timestamp,
    /// Where the money was spent.
    pub location: String,
    /// Free-text notes.
    pub notes: Option<String>,
    /// The member who recorded the expense.
    pub user_id: UserId,
    /// The family whose ledger the expense belongs to.
    pub family_id: FamilyId,
    /// When the expense document was created.
    pub created_at: Timestamp,
    /// When the expense document was last updated.
    pub updated_at: Timestamp,
}

#[cfg(test)]
mod expense_category_tests {
    use std::str::FromStr;

    use crate::ExpenseCategory;

    #[test]
    fn parses_labels_case_insensitively() {
        assert_eq!(
            ExpenseCategory::from_str("transportation"),
            Ok(ExpenseCategory::Transportation)
        );
    }

    #[test]
    fn serializes_as_label() {
        let json = serde_json::to_string(&ExpenseCategory::Healthcare).unwrap();

        assert_eq!(json, "\"Healthcare\"");
    }

    #[test]
    fn rejects_unknown_categories() {
        assert!(ExpenseCategory::from_str("Gambling").is_err());
    }
}
