//! The complete local copy of the signed-in user's data.

use serde::{Deserialize, Serialize};

use crate::{Error, Expense, Family, User};

/// The current user, their family, that family's members and its expenses at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSnapshot {
    /// The signed-in user, `None` when signed out.
    pub current_user: Option<User>,
    /// The family the signed-in user belongs to.
    pub current_family: Option<Family>,
    /// The expenses of the current family.
    pub expenses: Vec<Expense>,
    /// The known users, normally the members of the current family.
    pub users: Vec<User>,
    /// The known families.
    pub families: Vec<Family>,
}

impl AppSnapshot {
    /// Export the snapshot as pretty printed JSON.
    ///
    /// # Errors
    /// Returns [Error::JSONSerializationError] if the snapshot could not be serialized.
    pub fn to_json_pretty(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a snapshot previously written by [AppSnapshot::to_json_pretty].
    ///
    /// # Errors
    /// Returns [Error::JSONSerializationError] if `json` is not a valid snapshot.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod snapshot_tests {
    use time::macros::datetime;

    use crate::{
        AppSnapshot, Error, Expense, ExpenseCategory, ExpenseId, FamilyId, Timestamp, UserId,
    };

    #[test]
    fn export_can_be_read_back() {
        let snapshot = AppSnapshot {
            expenses: vec![Expense {
                id: ExpenseId::new("e1"),
                title: "Groceries".to_owned(),
                amount: 120.5,
                category: ExpenseCategory::Food,
                date: Timestamp::Known(datetime!(2024-03-01 0:00 UTC)),
                location: "Supermarket".to_owned(),
                notes: None,
                user_id: UserId::new("alice"),
                family_id: FamilyId::new("smiths"),
                created_at: Timestamp::Unknown,
                updated_at: Timestamp::Known(datetime!(2024-03-01 9:30 UTC)),
            }],
            ..Default::default()
        };

        let json = snapshot.to_json_pretty().unwrap();

        assert!(json.contains("\"currentUser\": null"));
        assert!(json.contains("\"date\": \"2024-03-01T00:00:00Z\""));
        assert_eq!(AppSnapshot::from_json(&json), Ok(snapshot));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            AppSnapshot::from_json("{\"expenses\": 3}"),
            Err(Error::JSONSerializationError(_))
        ));
    }
}
