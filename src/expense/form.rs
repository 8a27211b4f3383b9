//! Validation of the add/edit expense form.

use serde::{Deserialize, Serialize};
use time::{Date, UtcOffset};

use crate::{Error, ExpenseCategory, FieldErrors, Timestamp};

/// The raw values entered into the add/edit expense form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseForm {
    /// A short description of what was bought.
    pub title: String,
    /// The amount as typed by the user.
    pub amount: String,
    /// Where the money was spent.
    pub location: String,
    /// The date as typed by the user, e.g. "2024-03-01".
    pub date: String,
    /// What the money was spent on.
    pub category: ExpenseCategory,
    /// Optional free-text notes.
    #[serde(default)]
    pub notes: String,
}

impl Default for ExpenseForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            amount: String::new(),
            location: String::new(),
            date: String::new(),
            category: ExpenseCategory::Miscellaneous,
            notes: String::new(),
        }
    }
}

/// A validated expense that has not been saved yet.
///
/// Create one with [ExpenseForm::validate].
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseDraft {
    pub(crate) title: String,
    pub(crate) amount: f64,
    pub(crate) category: ExpenseCategory,
    pub(crate) date: Date,
    pub(crate) location: String,
    pub(crate) notes: Option<String>,
}

impl ExpenseDraft {
    /// The trimmed title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The amount, always greater than zero.
    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// The expense category.
    pub fn category(&self) -> ExpenseCategory {
        self.category
    }

    /// The calendar day the money was spent.
    pub fn date(&self) -> Date {
        self.date
    }

    /// The trimmed location.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// The trimmed notes, `None` if they were left blank.
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}

impl ExpenseForm {
    /// Check the form and convert it into an [ExpenseDraft].
    ///
    /// `offset` is the viewer's UTC offset, used to interpret the date.
    ///
    /// # Errors
    /// Returns [Error::InvalidForm] with a message for each field that is missing or invalid.
    pub fn validate(&self, offset: UtcOffset) -> Result<ExpenseDraft, Error> {
        let mut errors = FieldErrors::new();

        let title = self.title.trim();
        if title.is_empty() {
            errors.insert("title", "Title is required");
        }

        let amount = self.amount.trim().parse::<f64>().unwrap_or(0.0);
        if !amount.is_finite() || amount <= 0.0 {
            errors.insert("amount", "Amount must be greater than 0");
        }

        let location = self.location.trim();
        if location.is_empty() {
            errors.insert("location", "Location is required");
        }

        let date = if self.date.trim().is_empty() {
            errors.insert("date", "Date is required");
            None
        } else {
            let date = Timestamp::parse(&self.date, offset).date();
            if date.is_none() {
                errors.insert("date", "Date is invalid");
            }
            date
        };

        match date {
            Some(date) if errors.is_empty() => {
                let notes = self.notes.trim();

                Ok(ExpenseDraft {
                    title: title.to_owned(),
                    amount,
                    category: self.category,
                    date,
                    location: location.to_owned(),
                    notes: (!notes.is_empty()).then(|| notes.to_owned()),
                })
            }
            _ => Err(Error::InvalidForm(errors)),
        }
    }
}

impl From<&crate::Expense> for ExpenseForm {
    fn from(expense: &crate::Expense) -> Self {
        Self {
            title: expense.title.clone(),
            amount: expense.amount.to_string(),
            location: expense.location.clone(),
            date: expense
                .date
                .date()
                .map(|date| date.to_string())
                .unwrap_or_default(),
            category: expense.category,
            notes: expense.notes.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod expense_form_tests {
    use time::{UtcOffset, macros::date};

    use crate::{Error, ExpenseCategory, ExpenseForm};

    fn valid_form() -> ExpenseForm {
        ExpenseForm {
            title: " Groceries ".to_owned(),
            amount: "120.50".to_owned(),
            location: "Supermarket".to_owned(),
            date: "2024-03-01".to_owned(),
            category: ExpenseCategory::Food,
            notes: "   ".to_owned(),
        }
    }

    #[test]
    fn valid_form_produces_trimmed_draft() {
        let draft = valid_form().validate(UtcOffset::UTC).unwrap();

        assert_eq!(draft.title(), "Groceries");
        assert_eq!(draft.amount(), 120.50);
        assert_eq!(draft.date(), date!(2024 - 03 - 01));
        assert_eq!(draft.notes(), None);
    }

    #[test]
    fn accepts_us_formatted_dates() {
        let form = ExpenseForm {
            date: "03/01/2024".to_owned(),
            ..valid_form()
        };

        let draft = form.validate(UtcOffset::UTC).unwrap();

        assert_eq!(draft.date(), date!(2024 - 03 - 01));
    }

    #[test]
    fn empty_form_reports_every_required_field() {
        let result = ExpenseForm::default().validate(UtcOffset::UTC);

        let Err(Error::InvalidForm(errors)) = result else {
            panic!("want invalid form error, got {result:?}");
        };
        assert_eq!(errors.get("title"), Some("Title is required"));
        assert_eq!(errors.get("amount"), Some("Amount must be greater than 0"));
        assert_eq!(errors.get("location"), Some("Location is required"));
        assert_eq!(errors.get("date"), Some("Date is required"));
    }

    #[test]
    fn rejects_zero_negative_and_non_numeric_amounts() {
        for amount in ["0", "-4.20", "abc", "NaN", "inf"] {
            let form = ExpenseForm {
                amount: amount.to_owned(),
                ..valid_form()
            };

            let result = form.validate(UtcOffset::UTC);

            let Err(Error::InvalidForm(errors)) = result else {
                panic!("amount {amount} should be rejected, got {result:?}");
            };
            assert_eq!(errors.len(), 1);
            assert!(errors.get("amount").is_some());
        }
    }

    #[test]
    fn rejects_unreadable_dates() {
        let form = ExpenseForm {
            date: "yesterday".to_owned(),
            ..valid_form()
        };

        let result = form.validate(UtcOffset::UTC);

        let Err(Error::InvalidForm(errors)) = result else {
            panic!("want invalid form error, got {result:?}");
        };
        assert_eq!(errors.get("date"), Some("Date is invalid"));
    }
}
