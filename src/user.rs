//! Users of the application and their identifiers.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{Currency, FamilyId, Timestamp};

/// A newtype wrapper for user IDs.
///
/// User IDs are assigned by the authentication provider and double as the ID of the user's
/// document in the `users` collection.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub struct UserId(String);

impl UserId {
    /// Create a new user ID.
    pub fn new(id: &str) -> Self {
        Self(id.to_owned())
    }

    /// The ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A member of the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// The user's ID.
    pub id: UserId,
    /// The name shown to other family members.
    pub name: String,
    /// The user's email address, unique within a family.
    pub email: String,
    /// An optional URL of the user's avatar image.
    pub avatar: Option<String>,
    /// Whether the user can manage the family's settings and members.
    pub is_admin: bool,
    /// The family the user belongs to, `None` until they create or join one.
    pub family_id: Option<FamilyId>,
    /// The currency the user prefers amounts to be shown in.
    pub currency: Currency,
    /// When the user's document was created.
    pub created_at: Timestamp,
    /// When the user's document was last updated.
    pub updated_at: Timestamp,
}

impl User {
    /// Whether `email` matches this user's email, ignoring case.
    pub fn has_email(&self, email: &str) -> bool {
        self.email.trim().eq_ignore_ascii_case(email.trim())
    }
}
