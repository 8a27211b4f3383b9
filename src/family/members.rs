//! Adding and removing family members.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Family, FieldErrors, User, UserId};

/// The values entered into the "add member" form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberForm {
    /// The new member's display name.
    pub name: String,
    /// The new member's email address.
    pub email: String,
    /// Whether the new member may manage the family.
    #[serde(default)]
    pub is_admin: bool,
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();

    EMAIL.get_or_init(|| Regex::new(r"^\S+@\S+\.\S+$").expect("email pattern should compile"))
}

impl MemberForm {
    /// Check the form against the family's current `members`, returning it with trimmed values.
    ///
    /// # Errors
    /// Returns [Error::InvalidForm] if the name or email is missing, the email is malformed, or
    /// another member already uses the email (ignoring case).
    pub fn validate(&self, members: &[User]) -> Result<MemberForm, Error> {
        let mut errors = FieldErrors::new();

        let name = self.name.trim();
        if name.is_empty() {
            errors.insert("name", "Name is required");
        }

        let email = self.email.trim();
        if email.is_empty() {
            errors.insert("email", "Email is required");
        } else if !email_pattern().is_match(email) {
            errors.insert("email", "Email is invalid");
        } else if members.iter().any(|member| member.has_email(email)) {
            errors.insert("email", "A member with this email already exists");
        }

        if !errors.is_empty() {
            return Err(Error::InvalidForm(errors));
        }

        Ok(MemberForm {
            name: name.to_owned(),
            email: email.to_owned(),
            is_admin: self.is_admin,
        })
    }
}

/// Check whether `actor` may remove the member `member_id` from `family`.
///
/// # Errors
/// - [Error::NotAdmin] if `actor` is not an admin of the family.
/// - [Error::NotAMember] if `member_id` is not in the family.
/// - [Error::CannotRemoveLastMember] if `member_id` is the only member.
/// - [Error::CannotRemoveSelf] if `actor` is removing themselves.
/// - [Error::CannotRemoveOwner] if `member_id` is the family owner.
pub fn check_member_removal(family: &Family, actor: &User, member_id: &UserId) -> Result<(), Error> {
    let is_admin = family
        .member(&actor.id)
        .is_some_and(|member| member.is_admin);
    if !is_admin {
        return Err(Error::NotAdmin);
    }

    if family.member(member_id).is_none() {
        return Err(Error::NotAMember);
    }

    if family.members.len() <= 1 {
        return Err(Error::CannotRemoveLastMember);
    }

    if &actor.id == member_id {
        return Err(Error::CannotRemoveSelf);
    }

    if &family.owner_id == member_id {
        return Err(Error::CannotRemoveOwner);
    }

    Ok(())
}

/// Check whether `user` may leave `family`.
///
/// # Errors
/// - [Error::NotAMember] if `user` is not in the family.
/// - [Error::OwnerCannotLeave] if `user` owns the family.
pub(crate) fn check_leave(family: &Family, user: &UserId) -> Result<(), Error> {
    if family.member(user).is_none() {
        return Err(Error::NotAMember);
    }

    if &family.owner_id == user {
        return Err(Error::OwnerCannotLeave);
    }

    Ok(())
}



#[cfg(test)]
mod member_removal_tests {
    use super::{
        check_leave,
        test_utils::{family, user},
    };
    use crate::{Error, UserId, check_member_removal};

    #[test]
    fn admin_can_remove_other_member() {
        let admin = user("alice", true);
        let family = family("alice", vec![admin.clone(), user("bob", false)]);

        assert_eq!(
            check_member_removal(&family, &admin, &UserId::new("bob")),
            Ok(())
        );
    }

    #[test]
    fn cannot_remove_last_member() {
        let admin = user("alice", true);
        let family = family("someone-else", vec![admin.clone()]);

        assert_eq!(
            check_member_removal(&family, &admin, &UserId::new("alice")),
            Err(Error::CannotRemoveLastMember)
        );
    }

    #[test]
    fn cannot_remove_self() {
        let admin = user("alice", true);
        let family = family("bob", vec![admin.clone(), user("bob", false)]);

        assert_eq!(
            check_member_removal(&family, &admin, &UserId::new("alice")),
            Err(Error::CannotRemoveSelf)
        );
    }

    #[test]
    fn cannot_remove_owner() {
        let admin = user("alice", true);
        let family = family("bob", vec![admin.clone(), user("bob", false)]);

        assert_eq!(
            check_member_removal(&family, &admin, &UserId::new("bob")),
            Err(Error::CannotRemoveOwner)
        );
    }

    #[test]
    fn non_admin_cannot_remove_members() {
        let member = user("bob", false);
        let family = family("alice", vec![user("alice", true), member.clone(), user("carol", false)]);

        assert_eq!(
            check_member_removal(&family, &member, &UserId::new("carol")),
            Err(Error::NotAdmin)
        );
    }

    #[test]
    fn owner_cannot_leave_but_members_can() {
        let family = family("alice", vec![user("alice", true), user("bob", false)]);

        assert_eq!(
            check_leave(&family, &UserId::new("alice")),
            Err(Error::OwnerCannotLeave)
        );
        assert_eq!(check_leave(&family, &UserId::new("bob")), Ok(()));
    }
}
