//! Fiscal period keys.
//!
//! A [`FiscalPeriod`] is the fiscal-year-end date exactly as a provider
//! reported it. Two providers may report slightly different end dates for the
//! same fiscal year; no alignment is attempted, periods compare by exact date.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DataError;

/// Date format of period keys on the wire and in reports.
pub const PERIOD_FORMAT: &str = "%Y-%m-%d";

/// A fiscal-period-end date, the column key of a statement table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FiscalPeriod(NaiveDate);

impl FiscalPeriod {
    /// Creates a period from its end date.
    #[must_use]
    pub const fn new(end: NaiveDate) -> Self {
        Self(end)
    }

    /// Creates a period from year, month and day; `None` if the date is invalid.
    #[must_use]
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Parses a provider timestamp such as `2020-09-26` or `2020-09-26 00:00:00`.
    pub fn parse(s: &str) -> crate::error::Result<Self> {
        let date_part = s.trim().split([' ', 'T']).next().unwrap_or_default();
        NaiveDate::parse_from_str(date_part, PERIOD_FORMAT)
            .map(Self)
            .map_err(|e| DataError::Parse(format!("invalid period '{s}': {e}")))
    }

    /// Returns the period end date.
    #[must_use]
    pub const fn end_date(&self) -> NaiveDate {
        self.0
    }

    /// Returns the calendar year of the period end.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.0.year()
    }
}

impl fmt::Display for FiscalPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(PERIOD_FORMAT))
    }
}

impl FromStr for FiscalPeriod {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FiscalPeriod {
    type Error = DataError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<FiscalPeriod> for String {
    fn from(period: FiscalPeriod) -> Self {
        period.to_string()
    }
}

impl From<NaiveDate> for FiscalPeriod {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}
