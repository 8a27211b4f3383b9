//! Families, join codes and member management.

mod domain;
mod members;

pub use domain::{Family, FamilyDraft, FamilyId, JoinCode};
pub(crate) use members::check_leave;
pub use members::{MemberForm, check_member_removal};

#[cfg(test)]
pub(crate) use members::test_utils;
