//! Calendar periods used to select expenses for reports.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::{Date, Duration, util};

/// The period a report covers.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    /// Sunday to Saturday.
    Week,
    /// A calendar month.
    #[default]
    Month,
    /// A calendar year.
    Year,
}

impl Timeframe {
    /// The lower case name used in queries and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Timeframe::Week => "week",
            Timeframe::Month => "month",
            Timeframe::Year => "year",
        }
    }
}

impl Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "week" => Ok(Timeframe::Week),
            "month" => Ok(Timeframe::Month),
            "year" => Ok(Timeframe::Year),
            other => Err(format!("unknown timeframe \"{other}\"")),
        }
    }
}

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    /// The first day in the range.
    pub start: Date,
    /// The last day in the range.
    pub end: Date,
}

impl DateRange {
    /// Whether `date` falls within the range.
    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }
}

/// The range of `timeframe` that contains `anchor`.
pub fn timeframe_range(timeframe: Timeframe, anchor: Date) -> DateRange {
    match timeframe {
        Timeframe::Week => week_bounds(anchor),
        Timeframe::Month => month_bounds(anchor),
        Timeframe::Year => year_bounds(anchor),
    }
}

fn week_bounds(anchor: Date) -> DateRange {
    let days_since_sunday = i64::from(anchor.weekday().number_days_from_sunday());
    let start = anchor - Duration::days(days_since_sunday);
    let end = start + Duration::days(6);

    DateRange { start, end }
}

fn month_bounds(anchor: Date) -> DateRange {
    let start = anchor - Duration::days(i64::from(anchor.day()) - 1);
    let length = anchor.month().length(anchor.year());
    let end = start + Duration::days(i64::from(length) - 1);

    DateRange { start, end }
}

fn year_bounds(anchor: Date) -> DateRange {
    let start = anchor - Duration::days(i64::from(anchor.ordinal()) - 1);
    let end = start + Duration::days(i64::from(util::days_in_year(anchor.year())) - 1);

    DateRange { start, end }
}
