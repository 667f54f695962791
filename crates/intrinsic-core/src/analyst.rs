//! Analyst recommendation trends and EPS estimates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Analyst recommendation counts for one period.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationTrend {
    /// First day of the period the counts refer to.
    pub period: NaiveDate,
    /// Number of strong buy ratings.
    pub strong_buy: u32,
    /// Number of buy ratings.
    pub buy: u32,
    /// Number of hold ratings.
    pub hold: u32,
    /// Number of sell ratings.
    pub sell: u32,
    /// Number of strong sell ratings.
    pub strong_sell: u32,
}

impl RecommendationTrend {
    /// Total number of ratings.
    #[must_use]
    pub fn total(&self) -> u64 {
        [self.strong_buy, self.buy, self.hold, self.sell, self.strong_sell]
            .into_iter()
            .map(u64::from)
            .sum()
    }

    /// Weighted mean rating: buys count 1, holds 2, sells 3.
    ///
    /// Returns `None` when there are no ratings.
    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        if self.total() == 0 {
            return None;
        }
        let buys = f64::from(self.strong_buy) + f64::from(self.buy);
        let holds = f64::from(self.hold);
        let sells = f64::from(self.sell) + f64::from(self.strong_sell);
        Some((buys + holds * 2.0 + sells * 3.0) / (buys + holds + sells))
    }
}

/// Returns the trend with the latest period.
#[must_use]
pub fn latest_trend(trends: &[RecommendationTrend]) -> Option<&RecommendationTrend> {
    trends.iter().max_by_key(|t| t.period)
}

/// Consensus EPS estimate for one fiscal period.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpsEstimate {
    /// Fiscal period end the estimate refers to.
    pub period: NaiveDate,
    /// Average estimate.
    pub eps_avg: Option<f64>,
    /// Highest estimate.
    pub eps_high: Option<f64>,
    /// Lowest estimate.
    pub eps_low: Option<f64>,
    /// Number of contributing analysts.
    pub number_analysts: Option<u32>,
}

/// Returns the current-year and next-year estimates relative to `as_of`.
///
/// The current year is the estimate with the earliest period end on or after
/// `as_of`; the next year is the estimate following it.
#[must_use]
pub fn current_and_next(
    estimates: &[EpsEstimate],
    as_of: NaiveDate,
) -> (Option<&EpsEstimate>, Option<&EpsEstimate>) {
    let mut upcoming: Vec<&EpsEstimate> = estimates.iter().filter(|e| e.period >= as_of).collect();
    upcoming.sort_by_key(|e| e.period);
    let mut iter = upcoming.into_iter();
    (iter.next(), iter.next())
}
