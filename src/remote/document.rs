//! The shapes exchanged with the remote document store.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// The top-level fields of a document.
pub type Fields = serde_json::Map<String, Value>;

/// The collections the application reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    /// User profiles, keyed by the auth provider's user ID.
    Users,
    /// Families and their join codes.
    Families,
    /// Expenses of every family.
    Expenses,
    /// A record of each data export.
    Exports,
    /// Gmail OAuth tokens, keyed by user ID.
    GmailTokens,
}

impl Collection {
    /// The collection's name in the remote store.
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Families => "families",
            Collection::Expenses => "expenses",
            Collection::Exports => "exports",
            Collection::GmailTokens => "gmailTokens",
        }
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document read from the remote store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// The document's ID within its collection.
    pub id: String,
    /// The document's top-level fields.
    pub fields: Fields,
}

/// A condition a document must meet to be returned by a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// The name of a top-level field.
    pub field: String,
    /// The value the field must equal.
    pub value: Value,
}

impl Filter {
    /// Match documents whose `field` equals `value`.
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_owned(),
            value: value.into(),
        }
    }
}

/// Notification that a document was written or deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// The collection of the changed document.
    pub collection: Collection,
    /// The ID of the changed document.
    pub id: String,
}

/// Generate an ID for a new document.
pub fn new_document_id() -> String {
    Uuid::new_v4().simple().to_string()
}
