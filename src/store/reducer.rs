//! The pure function that applies actions to snapshots.

use std::collections::HashSet;

use crate::{Action, AppSnapshot, Expense, ExpenseId, Family, FamilyId, User, UserId};

/// A record stored in one of the snapshot's collections.
trait Keyed {
    type Key: Eq + std::hash::Hash + Clone;

    fn key(&self) -> &Self::Key;
}

impl Keyed for Expense {
    type Key = ExpenseId;

    fn key(&self) -> &ExpenseId {
        &self.id
    }
}

impl Keyed for User {
    type Key = UserId;

    fn key(&self) -> &UserId {
        &self.id
    }
}

impl Keyed for Family {
    type Key = FamilyId;

    fn key(&self) -> &FamilyId {
        &self.id
    }
}

/// Keep the first record for each ID.
fn dedup<T: Keyed>(records: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();

    records
        .into_iter()
        .filter(|record| seen.insert(record.key().clone()))
        .collect()
}

fn add<T: Keyed>(mut records: Vec<T>, record: T) -> Vec<T> {
    match records.iter_mut().find(|existing| existing.key() == record.key()) {
        Some(existing) => *existing = record,
        None => records.push(record),
    }

    records
}

fn edit<T: Keyed>(records: Vec<T>, record: &T) -> Vec<T>
where
    T: Clone,
{
    records
        .into_iter()
        .map(|existing| {
            if existing.key() == record.key() {
                record.clone()
            } else {
                existing
            }
        })
        .collect()
}

fn delete<T: Keyed>(records: Vec<T>, key: &T::Key) -> Vec<T> {
    records
        .into_iter()
        .filter(|record| record.key() != key)
        .collect()
}

/// Replace `current` with `record` if they share an ID.
fn refresh_current<T: Keyed + Clone>(current: Option<T>, record: &T) -> Option<T> {
    match current {
        Some(current) if current.key() == record.key() => Some(record.clone()),
        current => current,
    }
}

/// Apply `action` to `state`, returning the new state.
///
/// The reducer never performs side effects. Collections keep their order: new records are
/// appended, edited records stay where they were.
pub fn reduce(state: AppSnapshot, action: Action) -> AppSnapshot {
    match action {
        Action::ReplaceExpenses(expenses) => AppSnapshot {
            expenses: dedup(expenses),
            ..state
        },
        Action::AddExpense(expense) => AppSnapshot {
            expenses: add(state.expenses, expense),
            ..state
        },
        Action::EditExpense(expense) => AppSnapshot {
            expenses: edit(state.expenses, &expense),
            ..state
        },
        Action::DeleteExpense(id) => AppSnapshot {
            expenses: delete(state.expenses, &id),
            ..state
        },

        Action::ReplaceUsers(users) => AppSnapshot {
            users: dedup(users),
            ..state
        },
        Action::AddUser(user) => AppSnapshot {
            users: add(state.users, user),
            ..state
        },
        Action::EditUser(user) => AppSnapshot {
            current_user: refresh_current(state.current_user, &user),
            users: edit(state.users, &user),
            ..state
        },
        Action::DeleteUser(id) => AppSnapshot {
            users: delete(state.users, &id),
            ..state
        },

        Action::ReplaceFamilies(families) => AppSnapshot {
            families: dedup(families),
            ..state
        },
        Action::AddFamily(family) => AppSnapshot {
            families: add(state.families, family),
            ..state
        },
        Action::EditFamily(family) => AppSnapshot {
            current_family: refresh_current(state.current_family, &family),
            families: edit(state.families, &family),
            ..state
        },
        Action::DeleteFamily(id) => AppSnapshot {
            families: delete(state.families, &id),
            ..state
        },

        Action::SetCurrentUser(current_user) => AppSnapshot {
            current_user,
            ..state
        },
        Action::SetCurrentFamily(current_family) => AppSnapshot {
            current_family,
            ..state
        },

        Action::Load(snapshot) => snapshot,
    }
}
