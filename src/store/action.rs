//! The actions the local store understands.

use crate::{AppSnapshot, Expense, ExpenseId, Family, FamilyId, User, UserId};

/// A change to apply to an [AppSnapshot] via [reduce](crate::reduce).
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Replace every expense.
    ReplaceExpenses(Vec<Expense>),
    /// Add an expense, or replace the expense with the same ID.
    AddExpense(Expense),
    /// Replace the expense with the same ID.
    EditExpense(Expense),
    /// Remove the expense with the given ID.
    DeleteExpense(ExpenseId),

    /// Replace every known user.
    ReplaceUsers(Vec<User>),
    /// Add a user, or replace the user with the same ID.
    AddUser(User),
    /// Replace the user with the same ID.
    EditUser(User),
    /// Remove the user with the given ID.
    DeleteUser(UserId),

    /// Replace every known family.
    ReplaceFamilies(Vec<Family>),
    /// Add a family, or replace the family with the same ID.
    AddFamily(Family),
    /// Replace the family with the same ID.
    EditFamily(Family),
    /// Remove the family with the given ID.
    DeleteFamily(FamilyId),

    /// Set or clear the signed-in user.
    SetCurrentUser(Option<User>),
    /// Set or clear the current family.
    SetCurrentFamily(Option<Family>),

    /// Replace the whole snapshot.
    Load(AppSnapshot),
}
