//! Normalization of remote timestamps into a single textual date representation.
//!
//! The remote document store keeps dates in several shapes: its own native
//! timestamp object, ISO-8601 strings written by newer clients, and
//! "MM/DD/YYYY" strings written by older ones. Everything read from the store
//! goes through [Timestamp::from_remote] so the rest of the crate only deals
//! with one type.

use std::fmt::Display;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Value, json};
use time::{
    Date, Month, OffsetDateTime, PrimitiveDateTime, UtcOffset,
    format_description::well_known::{Iso8601, Rfc3339},
    macros::format_description,
};

/// The text used for timestamps that could not be understood.
pub const UNKNOWN_LABEL: &str = "unknown";

/// A point in time read from the remote store, or an explicit marker that it could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timestamp {
    /// A valid point in time, expressed in the viewer's UTC offset.
    Known(OffsetDateTime),
    /// The remote value was missing or malformed.
    Unknown,
}

impl Timestamp {
    /// The current time in UTC.
    pub fn now() -> Self {
        Self::Known(OffsetDateTime::now_utc())
    }

    /// Midnight at the start of `date` at `offset`.
    pub fn from_date(date: Date, offset: UtcOffset) -> Self {
        Self::Known(date.midnight().assume_offset(offset))
    }

    /// Normalize a remote field value.
    ///
    /// Accepts RFC 3339/ISO-8601 strings, "YYYY-MM-DD" and "MM/DD/YYYY" strings, the store's
    /// native `{seconds, nanoseconds}` object and integer milliseconds since the Unix epoch.
    /// Dates without a time of day are placed at midnight at `offset`. Anything else produces
    /// [Timestamp::Unknown].
    pub fn from_remote(value: &Value, offset: UtcOffset) -> Self {
        match value {
            Value::String(text) => Self::parse(text, offset),
            Value::Object(fields) => {
                let seconds = fields
                    .get("seconds")
                    .or_else(|| fields.get("_seconds"))
                    .and_then(Value::as_i64);
                let nanoseconds = fields
                    .get("nanoseconds")
                    .or_else(|| fields.get("_nanoseconds"))
                    .and_then(Value::as_i64)
                    .unwrap_or(0);

                match seconds {
                    Some(seconds) => Self::from_unix_nanos(
                        i128::from(seconds) * 1_000_000_000 + i128::from(nanoseconds),
                        offset,
                    ),
                    None => Self::Unknown,
                }
            }
            Value::Number(number) => match number.as_i64() {
                Some(milliseconds) => {
                    Self::from_unix_nanos(i128::from(milliseconds) * 1_000_000, offset)
                }
                None => Self::Unknown,
            },
            _ => Self::Unknown,
        }
    }

    /// Normalize a textual timestamp, see [Timestamp::from_remote].
    pub fn parse(text: &str, offset: UtcOffset) -> Self {
        let text = text.trim();

        if text.eq_ignore_ascii_case(UNKNOWN_LABEL) || text.is_empty() {
            return Self::Unknown;
        }

        if let Ok(date_time) = OffsetDateTime::parse(text, &Rfc3339) {
            return Self::Known(date_time.to_offset(offset));
        }

        if let Ok(date_time) = OffsetDateTime::parse(text, &Iso8601::DEFAULT) {
            return Self::Known(date_time.to_offset(offset));
        }

        // ISO date-times without an offset are taken to be in the viewer's time zone.
        if let Ok(date_time) = PrimitiveDateTime::parse(text, &Iso8601::DEFAULT) {
            return Self::Known(date_time.assume_offset(offset));
        }

        if let Ok(date) = Date::parse(text, format_description!("[year]-[month]-[day]")) {
            return Self::from_date(date, offset);
        }

        match parse_us_date(text) {
            Some(date) => Self::from_date(date, offset),
            None => Self::Unknown,
        }
    }

    /// The calendar day of the timestamp, if it is known.
    pub fn date(&self) -> Option<Date> {
        match self {
            Self::Known(date_time) => Some(date_time.date()),
            Self::Unknown => None,
        }
    }

    /// Whether the timestamp could not be read.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// The store's native timestamp object for this timestamp, or `null` if it is unknown.
    pub fn to_remote(&self) -> Value {
        match self {
            Self::Known(date_time) => {
                json!({
                    "seconds": date_time.unix_timestamp(),
                    "nanoseconds": date_time.nanosecond(),
                })
            }
            Self::Unknown => Value::Null,
        }
    }

    fn from_unix_nanos(nanoseconds: i128, offset: UtcOffset) -> Self {
        match OffsetDateTime::from_unix_timestamp_nanos(nanoseconds) {
            Ok(date_time) => Self::Known(date_time.to_offset(offset)),
            Err(_) => Self::Unknown,
        }
    }
}

/// Parse "MM/DD/YYYY", also accepting unpadded month and day numbers.
fn parse_us_date(text: &str) -> Option<Date> {
    let mut parts = text.split('/');
    let month: u8 = parts.next()?.parse().ok()?;
    let day: u8 = parts.next()?.parse().ok()?;
    let year_text = parts.next()?;

    if parts.next().is_some() || year_text.len() != 4 {
        return None;
    }

    let year: i32 = year_text.parse().ok()?;
    let month = Month::try_from(month).ok()?;

    Date::from_calendar_date(year, month, day).ok()
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Known(date_time) => match date_time.format(&Rfc3339) {
                Ok(text) => f.write_str(&text),
                Err(_) => f.write_str(UNKNOWN_LABEL),
            },
            Self::Unknown => f.write_str(UNKNOWN_LABEL),
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;

        Ok(Self::from_remote(&value, UtcOffset::UTC))
    }
}
