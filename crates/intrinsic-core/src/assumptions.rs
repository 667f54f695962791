//! Valuation assumptions and the per-instrument config file.
//!
//! The config file is a JSON document named `<SYMBOL>.json`:
//!
//! ```json
//! {
//!   "assumptions": {
//!     "discountRate": 10,
//!     "margin_of_safety": 20,
//!     "growth_year_1_to_5": 8,
//!     "growth_year_6_to_10": 5,
//!     "growth_year_10ff": 2
//!   },
//!   "dates": { "quarterlyReports": [{ "date": "2024-07-25" }] }
//! }
//! ```
//!
//! All rates in the file are percentages. Every field may be absent.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{
    error::{AnalysisError, AnalysisResult, DataError, Result},
    types::Symbol,
};

/// DCF assumptions as stored in the config file, in percent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Assumptions {
    /// Discount rate.
    #[serde(rename = "discountRate", default, skip_serializing_if = "Option::is_none")]
    pub discount_rate: Option<f64>,
    /// Margin of safety.
    #[serde(rename = "margin_of_safety", default, skip_serializing_if = "Option::is_none")]
    pub margin_of_safety: Option<f64>,
    /// Free cash flow growth for years 1 to 5.
    #[serde(rename = "growth_year_1_to_5", default, skip_serializing_if = "Option::is_none")]
    pub growth_year_1_to_5: Option<f64>,
    /// Free cash flow growth for years 6 to 10.
    #[serde(rename = "growth_year_6_to_10", default, skip_serializing_if = "Option::is_none")]
    pub growth_year_6_to_10: Option<f64>,
    /// Perpetuity growth after year 10.
    #[serde(rename = "growth_year_10ff", default, skip_serializing_if = "Option::is_none")]
    pub growth_year_10ff: Option<f64>,
}

impl Assumptions {
    /// Creates a complete set of assumptions from percentages.
    #[must_use]
    pub const fn from_percent(
        discount_rate: f64,
        margin_of_safety: f64,
        growth_year_1_to_5: f64,
        growth_year_6_to_10: f64,
        growth_year_10ff: f64,
    ) -> Self {
        Self {
            discount_rate: Some(discount_rate),
            margin_of_safety: Some(margin_of_safety),
            growth_year_1_to_5: Some(growth_year_1_to_5),
            growth_year_6_to_10: Some(growth_year_6_to_10),
            growth_year_10ff: Some(growth_year_10ff),
        }
    }

    /// Returns the assumptions as fractions, or the config keys that are missing.
    pub fn complete(&self) -> AnalysisResult<DcfAssumptions> {
        let fields = [
            ("discountRate", self.discount_rate),
            ("margin_of_safety", self.margin_of_safety),
            ("growth_year_1_to_5", self.growth_year_1_to_5),
            ("growth_year_6_to_10", self.growth_year_6_to_10),
            ("growth_year_10ff", self.growth_year_10ff),
        ];
        let missing: Vec<&'static str> = fields
            .iter()
            .filter(|(_, v)| !v.is_some_and(f64::is_finite))
            .map(|(k, _)| *k)
            .collect();
        if !missing.is_empty() {
            return Err(AnalysisError::IncompleteAssumptions { missing });
        }

        let pct = |v: Option<f64>| v.unwrap_or_default() / 100.0;
        Ok(DcfAssumptions {
            discount_rate: pct(self.discount_rate),
            margin_of_safety: pct(self.margin_of_safety),
            growth_1_to_5: pct(self.growth_year_1_to_5),
            growth_6_to_10: pct(self.growth_year_6_to_10),
            perpetual_growth: pct(self.growth_year_10ff),
        })
    }
}

/// A complete set of DCF assumptions, as fractions (`0.1` is 10%).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DcfAssumptions {
    /// Discount rate per period.
    pub discount_rate: f64,
    /// Margin of safety.
    pub margin_of_safety: f64,
    /// Growth for years 1 to 5.
    pub growth_1_to_5: f64,
    /// Growth for years 6 to 10.
    pub growth_6_to_10: f64,
    /// Perpetuity growth after year 10.
    pub perpetual_growth: f64,
}

/// One configured report date.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDate {
    /// Calendar date of the report.
    pub date: NaiveDate,
}

/// Known report dates of an instrument.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDates {
    /// Quarterly report dates, in any order.
    #[serde(rename = "quarterlyReports", default, skip_serializing_if = "Vec::is_empty")]
    pub quarterly_reports: Vec<ReportDate>,
}

impl ReportDates {
    /// Returns the latest quarterly report date on or before `as_of`.
    #[must_use]
    pub fn latest_quarterly_report(&self, as_of: NaiveDate) -> Option<NaiveDate> {
        self.quarterly_reports
            .iter()
            .map(|r| r.date)
            .filter(|d| *d <= as_of)
            .max()
    }
}

/// The per-instrument config file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// DCF assumptions.
    #[serde(default)]
    pub assumptions: Assumptions,
    /// Report dates.
    #[serde(default)]
    pub dates: ReportDates,
}

impl InstrumentConfig {
    /// Parses a config document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| DataError::Parse(format!("instrument config: {e}")))
    }

    /// Loads a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| DataError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// Loads `<dir>/<SYMBOL>.json`; a missing file yields an empty config.
    pub fn load_for(dir: impl AsRef<Path>, symbol: &Symbol) -> Result<Self> {
        let path = Self::path_for(dir, symbol);
        if !path.exists() {
            debug!(path = %path.display(), "No instrument config, using empty assumptions");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Writes the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| DataError::Other(format!("serialize instrument config: {e}")))?;
        std::fs::write(path, json)
            .map_err(|e| DataError::Config(format!("{}: {e}", path.display())))
    }

    /// Returns the config file path of a symbol within a directory.
    #[must_use]
    pub fn path_for(dir: impl AsRef<Path>, symbol: &Symbol) -> PathBuf {
        dir.as_ref().join(format!("{symbol}.json"))
    }
}
