//! The documents stored in each remote collection and their conversion to domain types.
//!
//! Field names are camelCase as stored remotely. Timestamps are read as raw JSON values and
//! normalized with [Timestamp::from_remote].

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use time::UtcOffset;

use crate::{
    Collection, Currency, Document, Error, Expense, ExpenseCategory, ExpenseId, Family, FamilyId,
    Fields, JoinCode, Timestamp, User, UserId,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExpenseDocument {
    pub title: String,
    pub amount: f64,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub date: Value,
    pub category: ExpenseCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub user_id: String,
    pub family_id: String,
    #[serde(default)]
    pub created_at: Value,
    #[serde(default)]
    pub updated_at: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserDocument {
    /// Older documents were written without their ID, in which case the document ID is used.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    /// An empty string means the user has no family.
    #[serde(default)]
    pub family_id: String,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub created_at: Value,
    #[serde(default)]
    pub updated_at: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FamilyDocument {
    pub name: String,
    pub owner_id: String,
    #[serde(default)]
    pub member_ids: Vec<String>,
    #[serde(default)]
    pub default_currency: Currency,
    #[serde(default)]
    pub join_code: String,
    #[serde(default)]
    pub created_at: Value,
    #[serde(default)]
    pub updated_at: Value,
}

fn invalid(collection: Collection, id: &str, reason: impl ToString) -> Error {
    Error::InvalidDocument {
        collection: collection.as_str().to_owned(),
        id: id.to_owned(),
        reason: reason.to_string(),
    }
}

/// Read the fields of `document` as `T`.
pub(crate) fn parse<T: DeserializeOwned>(
    collection: Collection,
    document: &Document,
) -> Result<T, Error> {
    serde_json::from_value(Value::Object(document.fields.clone()))
        .map_err(|error| invalid(collection, &document.id, error))
}

/// Convert a schema type into the fields of a document.
pub(crate) fn to_fields<T: Serialize>(document: &T) -> Result<Fields, Error> {
    match serde_json::to_value(document)? {
        Value::Object(fields) => Ok(fields),
        other => Err(Error::JSONSerializationError(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

pub(crate) fn expense_from_document(
    document: &Document,
    offset: UtcOffset,
) -> Result<Expense, Error> {
    let fields: ExpenseDocument = parse(Collection::Expenses, document)?;

    if !fields.amount.is_finite() || fields.amount <= 0.0 {
        return Err(invalid(
            Collection::Expenses,
            &document.id,
            format!("amount must be greater than zero, got {}", fields.amount),
        ));
    }

    if fields.family_id.is_empty() {
        return Err(invalid(
            Collection::Expenses,
            &document.id,
            "expense does not belong to a family",
        ));
    }

    Ok(Expense {
        id: ExpenseId::new(&document.id),
        title: fields.title,
        amount: fields.amount,
        category: fields.category,
        date: Timestamp::from_remote(&fields.date, offset),
        location: fields.location,
        notes: fields.notes,
        user_id: UserId::new(&fields.user_id),
        family_id: FamilyId::new(&fields.family_id),
        created_at: Timestamp::from_remote(&fields.created_at, offset),
        updated_at: Timestamp::from_remote(&fields.updated_at, offset),
    })
}

pub(crate) fn user_from_document(document: &Document, offset: UtcOffset) -> Result<User, Error> {
    let fields: UserDocument = parse(Collection::Users, document)?;
    let id = fields
        .id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| document.id.clone());

    Ok(User {
        id: UserId::new(&id),
        name: fields.name,
        email: fields.email,
        avatar: fields.avatar.filter(|avatar| !avatar.is_empty()),
        is_admin: fields.is_admin,
        family_id: (!fields.family_id.is_empty()).then(|| FamilyId::new(&fields.family_id)),
        currency: fields.currency,
        created_at: Timestamp::from_remote(&fields.created_at, offset),
        updated_at: Timestamp::from_remote(&fields.updated_at, offset),
    })
}

pub(crate) fn family_from_document(
    document: &Document,
    members: Vec<User>,
    offset: UtcOffset,
) -> Result<Family, Error> {
    if document.id.is_empty() {
        return Err(Error::MissingFamilyId);
    }

    let fields: FamilyDocument = parse(Collection::Families, document)?;

    Ok(Family {
        id: FamilyId::new(&document.id),
        name: fields.name,
        owner_id: UserId::new(&fields.owner_id),
        default_currency: fields.default_currency,
        join_code: JoinCode::new_unchecked(&fields.join_code),
        members,
        created_at: Timestamp::from_remote(&fields.created_at, offset),
        updated_at: Timestamp::from_remote(&fields.updated_at, offset),
    })
}
