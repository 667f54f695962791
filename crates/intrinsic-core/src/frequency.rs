//! Data frequency and period type definitions.
//!
//! [`DataFrequency`] selects the bar size of a price history request and
//! [`PeriodType`] the reporting period of financial statements.

use serde::{Deserialize, Serialize};

/// Bar size of a price history.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataFrequency {
    /// Daily bars.
    #[default]
    Daily,
    /// Weekly bars.
    Weekly,
    /// Monthly bars.
    Monthly,
}

impl DataFrequency {
    /// Returns the interval parameter used by chart APIs ("1d", "1wk", "1mo").
    #[must_use]
    pub const fn interval(&self) -> &'static str {
        match self {
            Self::Daily => "1d",
            Self::Weekly => "1wk",
            Self::Monthly => "1mo",
        }
    }
}

/// Period type for fundamental financial data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodType {
    /// Annual reporting period.
    #[default]
    Annual,
    /// Quarterly reporting period.
    Quarterly,
}

impl PeriodType {
    /// Returns the `freq` query value used by statement APIs.
    #[must_use]
    pub const fn as_query(&self) -> &'static str {
        match self {
            Self::Annual => "annual",
            Self::Quarterly => "quarterly",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(DataFrequency::Daily, "1d")]
    #[case(DataFrequency::Weekly, "1wk")]
    #[case(DataFrequency::Monthly, "1mo")]
    fn test_interval(#[case] frequency: DataFrequency, #[case] expected: &str) {
        assert_eq!(frequency.interval(), expected);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(DataFrequency::default(), DataFrequency::Daily);
        assert_eq!(PeriodType::default().as_query(), "annual");
        assert_eq!(PeriodType::Quarterly.as_query(), "quarterly");
    }
}
