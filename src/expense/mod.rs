//! Expenses: the domain model, form validation and list helpers.

mod domain;
mod form;
mod list;

pub use domain::{Expense, ExpenseCategory, ExpenseId};
pub use form::{ExpenseDraft, ExpenseForm};
pub use list::{ExpenseFilter, group_by_date, recent_expenses};
