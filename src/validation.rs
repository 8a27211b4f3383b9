//! Field-level validation messages for user input.

use std::{collections::BTreeMap, fmt::Display};

use serde::Serialize;

/// Validation messages keyed by the name of the offending form field.
///
/// Forms are validated before any remote call is attempted, so an empty set of
/// errors means the input may be sent to the document store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    /// Create an empty set of field errors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` against `field`, replacing any earlier message for that field.
    pub fn insert(&mut self, field: &str, message: &str) {
        self.0.insert(field.to_owned(), message.to_owned());
    }

    /// The message recorded for `field`, if any.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Whether any field failed validation.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of fields that failed validation.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over `(field, message)` pairs in field name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(field, message)| (field.as_str(), message.as_str()))
    }
}

impl Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<String> = self
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect();

        write!(f, "{}", messages.join("; "))
    }
}

#[cfg(test)]
mod field_errors_tests {
    use super::FieldErrors;

    #[test]
    fn display_joins_messages_in_field_order() {
        let mut errors = FieldErrors::new();
        errors.insert("title", "Title is required");
        errors.insert("amount", "Amount must be greater than 0");

        assert_eq!(
            errors.to_string(),
            "amount: Amount must be greater than 0; title: Title is required"
        );
    }

    #[test]
    fn insert_replaces_earlier_message() {
        let mut errors = FieldErrors::new();
        errors.insert("email", "Email is required");
        errors.insert("email", "Email is invalid");

        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("email"), Some("Email is invalid"));
    }
}
