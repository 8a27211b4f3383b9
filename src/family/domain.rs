//! Core family domain types.

use std::fmt::Display;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Currency, Error, FieldErrors, Timestamp, User, UserId};

/// The document ID of a family.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub struct FamilyId(String);

impl FamilyId {
    /// Create a new family ID.
    pub fn new(id: &str) -> Self {
        Self(id.to_owned())
    }

    /// The ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FamilyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A short shared secret that lets a new user attach to an existing family.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct JoinCode(String);

impl JoinCode {
    /// The number of characters in a generated join code.
    pub const LENGTH: usize = 8;

    const ALPHABET: &'static [u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    /// Generate a random join code of [JoinCode::LENGTH] upper case letters and digits.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let code = (0..Self::LENGTH)
            .map(|_| char::from(Self::ALPHABET[rng.gen_range(0..Self::ALPHABET.len())]))
            .collect();

        Self(code)
    }

    /// Read a join code typed by a user, ignoring surrounding whitespace and case.
    ///
    /// # Errors
    /// Returns [Error::InvalidForm] if `code` is blank.
    pub fn parse(code: &str) -> Result<Self, Error> {
        let code = code.trim();

        if code.is_empty() {
            let mut errors = FieldErrors::new();
            errors.insert("joinCode", "Family code is required");
            return Err(Error::InvalidForm(errors));
        }

        Ok(Self(code.to_uppercase()))
    }

    /// Wrap a join code read from the remote store without validation.
    pub fn new_unchecked(code: &str) -> Self {
        Self(code.to_owned())
    }
}

impl AsRef<str> for JoinCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for JoinCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A group of users sharing one expense ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Family {
    /// The ID of the family document.
    pub id: FamilyId,
    /// The family's display name.
    pub name: String,
    /// The user who created the family.
    pub owner_id: UserId,
    /// The currency new members default to.
    pub default_currency: Currency,
    /// The code new members use to join.
    pub join_code: JoinCode,
    /// The users whose documents point at this family.
    pub members: Vec<User>,
    /// When the family document was created.
    pub created_at: Timestamp,
    /// When the family document was last updated.
    pub updated_at: Timestamp,
}

impl Family {
    /// The member with the ID `user_id`, if they belong to the family.
    pub fn member(&self, user_id: &UserId) -> Option<&User> {
        self.members.iter().find(|member| &member.id == user_id)
    }
}

/// The values entered when creating a family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyDraft {
    /// The family's display name.
    pub name: String,
    /// The currency new members default to.
    pub default_currency: Currency,
}

impl FamilyDraft {
    /// Check the draft, returning it with a trimmed name.
    ///
    /// # Errors
    /// Returns [Error::InvalidForm] if the name is blank.
    pub fn validate(self) -> Result<Self, Error> {
        let name = self.name.trim();

        if name.is_empty() {
            let mut errors = FieldErrors::new();
            errors.insert("name", "Family name is required");
            return Err(Error::InvalidForm(errors));
        }

        Ok(Self {
            name: name.to_owned(),
            default_currency: self.default_currency,
        })
    }
}
