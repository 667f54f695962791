//! Core data types shared by providers and engines.
//!
//! - [`Symbol`] - Ticker, optionally qualified by an exchange suffix
//! - [`OhlcvBar`] - One bar of price history
//! - [`CompanyProfile`] - Company reference information

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A trading symbol/ticker.
///
/// Symbols are uppercased on creation. A trading place can be appended as a
/// dot suffix (`ALV.DE`), which is how the price providers address
/// non-US listings.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new symbol from a string, converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_uppercase())
    }

    /// Returns the symbol qualified by a trading place suffix.
    ///
    /// An empty suffix returns the symbol unchanged.
    #[must_use]
    pub fn with_exchange(&self, exchange: &str) -> Self {
        if exchange.is_empty() {
            return self.clone();
        }
        Self::new(format!("{}.{}", self.base(), exchange))
    }

    /// Returns the ticker without any trading place suffix.
    #[must_use]
    pub fn base(&self) -> &str {
        self.0.split_once('.').map_or(self.0.as_str(), |(base, _)| base)
    }

    /// Returns the trading place suffix, if any.
    #[must_use]
    pub fn exchange(&self) -> Option<&str> {
        self.0.split_once('.').map(|(_, exchange)| exchange)
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// One bar of OHLC price history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    /// Trading date of the bar.
    pub date: NaiveDate,
    /// Opening price.
    pub open: f64,
    /// Highest price during the period.
    pub high: f64,
    /// Lowest price during the period.
    pub low: f64,
    /// Closing price.
    pub close: f64,
    /// Trading volume.
    pub volume: f64,
}

impl OhlcvBar {
    /// Creates a new bar.
    #[must_use]
    pub const fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Creates a bar where every price equals `price`.
    #[must_use]
    pub const fn flat(date: NaiveDate, price: f64) -> Self {
        Self::new(date, price, price, price, price, 0.0)
    }
}

/// Company reference information.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    /// Stock symbol.
    pub symbol: Symbol,
    /// Company name.
    pub name: Option<String>,
    /// Primary exchange.
    pub exchange: Option<String>,
    /// Industry classification.
    pub industry: Option<String>,
    /// Country of incorporation.
    pub country: Option<String>,
    /// Reporting currency.
    pub currency: Option<String>,
    /// Market capitalization in currency units.
    pub market_cap: Option<f64>,
    /// Shares outstanding.
    pub shares_outstanding: Option<f64>,
}

impl CompanyProfile {
    /// Creates an empty profile for a symbol.
    #[must_use]
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            ..Default::default()
        }
    }
}
