//! Canonical metric names.
//!
//! Every provider adapter translates its own vocabulary into [`Metric`]. Line
//! items without a canonical counterpart are kept under their reported name
//! as [`Metric::Reported`], so a metric name stays unique within a table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A row key of the statement table.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Metric {
    /// Total revenue / sales.
    TotalRevenue,
    /// Net income.
    NetIncome,
    /// Operating income.
    OperatingIncome,
    /// Earnings before interest and taxes.
    Ebit,
    /// Total stockholders' equity.
    StockholdersEquity,
    /// Total assets.
    TotalAssets,
    /// Net cash from operating activities.
    CashFromOperatingActivities,
    /// Capital expenditures (purchases of PP&E and intangibles).
    CapitalExpenditures,
    /// Operating cash flow minus capital expenditures.
    FreeCashFlow,
    /// Diluted earnings per share.
    DilutedEps,
    /// Basic earnings per share.
    BasicEps,
    /// Weighted average diluted shares outstanding.
    DilutedAverageShares,
    /// A reported line item without a canonical mapping.
    Reported(String),
}

impl Metric {
    /// All canonical metrics, in table order.
    pub const CANONICAL: [Self; 12] = [
        Self::TotalRevenue,
        Self::NetIncome,
        Self::OperatingIncome,
        Self::Ebit,
        Self::StockholdersEquity,
        Self::TotalAssets,
        Self::CashFromOperatingActivities,
        Self::CapitalExpenditures,
        Self::FreeCashFlow,
        Self::DilutedEps,
        Self::BasicEps,
        Self::DilutedAverageShares,
    ];

    /// Returns the canonical label used in reports and frames.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::TotalRevenue => "Total Revenue",
            Self::NetIncome => "Net Income",
            Self::OperatingIncome => "Operating Income",
            Self::Ebit => "Ebit",
            Self::StockholdersEquity => "Total Stockholder Equity",
            Self::TotalAssets => "Total Assets",
            Self::CashFromOperatingActivities => "Total Cash From Operating Activities",
            Self::CapitalExpenditures => "Capital Expenditures",
            Self::FreeCashFlow => "freeCashFlow",
            Self::DilutedEps => "dilutedEPS",
            Self::BasicEps => "basicEPS",
            Self::DilutedAverageShares => "dilutedAverageShares",
            Self::Reported(name) => name,
        }
    }

    /// Resolves a label to a canonical metric, or keeps it as reported.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        Self::CANONICAL
            .into_iter()
            .find(|m| m.name() == name)
            .unwrap_or_else(|| Self::Reported(name.to_string()))
    }

    /// Returns true for metrics without a canonical mapping.
    #[must_use]
    pub const fn is_reported(&self) -> bool {
        matches!(self, Self::Reported(_))
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<String> for Metric {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<&str> for Metric {
    fn from(name: &str) -> Self {
        Self::from_name(name)
    }
}

impl From<Metric> for String {
    fn from(metric: Metric) -> Self {
        metric.name().to_string()
    }
}
