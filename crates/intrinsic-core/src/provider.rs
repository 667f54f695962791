//! Provider traits for fetching instrument data.
//!
//! This module defines the core provider traits:
//!
//! - [`DataProvider`] - Base trait for all data providers
//! - [`StatementProvider`] - Financial statements as a canonical [`StatementTable`]
//! - [`QuoteProvider`] - Current price, per-share data and key statistics
//! - [`PriceHistoryProvider`] - OHLC price history
//! - [`EstimatesProvider`] - Analyst recommendations and EPS estimates
//! - [`ReferenceDataProvider`] - Company profile and peer group

use async_trait::async_trait;
use chrono::NaiveDate;
use polars::prelude::DataFrame;
use std::fmt::Debug;

use crate::{
    analyst::{EpsEstimate, RecommendationTrend},
    error::Result,
    facts::QuoteSnapshot,
    frequency::{DataFrequency, PeriodType},
    history::PriceHistory,
    table::StatementTable,
    types::{CompanyProfile, Symbol},
};

/// Base trait for all data providers.
pub trait DataProvider: Send + Sync + Debug {
    /// Returns the name of this provider (e.g., "Yahoo Finance").
    fn name(&self) -> &str;

    /// Returns a description of this provider.
    fn description(&self) -> &str;
}

/// Provider of financial statements.
///
/// Implementations translate their own line-item vocabulary into canonical
/// [`Metric`](crate::metric::Metric)s. A concept the source does not report
/// must be absent from the table, not a NaN cell.
#[async_trait]
pub trait StatementProvider: DataProvider {
    /// Fetches balance sheet, income statement and cash flow statement merged
    /// into one table.
    async fn fetch_statements(
        &self,
        symbol: &Symbol,
        period_type: PeriodType,
    ) -> Result<StatementTable>;
}

/// Provider of current quote data.
#[async_trait]
pub trait QuoteProvider: DataProvider {
    /// Fetches price, per-share data and key statistics.
    async fn fetch_quote(&self, symbol: &Symbol) -> Result<QuoteSnapshot>;
}

/// Provider of OHLC price history.
#[async_trait]
pub trait PriceHistoryProvider: DataProvider {
    /// Fetches OHLC data for a single symbol.
    ///
    /// Returns a DataFrame with columns: date, open, high, low, close, volume.
    async fn fetch_ohlcv(
        &self,
        symbol: &Symbol,
        start: NaiveDate,
        end: NaiveDate,
        frequency: DataFrequency,
    ) -> Result<DataFrame>;

    /// Fetches OHLC data as a [`PriceHistory`].
    async fn fetch_history(
        &self,
        symbol: &Symbol,
        start: NaiveDate,
        end: NaiveDate,
        frequency: DataFrequency,
    ) -> Result<PriceHistory> {
        let df = self.fetch_ohlcv(symbol, start, end, frequency).await?;
        PriceHistory::from_frame(&df)
    }
}

/// Provider of analyst data.
#[async_trait]
pub trait EstimatesProvider: DataProvider {
    /// Fetches recommendation trends, one entry per period.
    async fn recommendations(&self, symbol: &Symbol) -> Result<Vec<RecommendationTrend>>;

    /// Fetches annual EPS estimates.
    async fn eps_estimates(&self, symbol: &Symbol) -> Result<Vec<EpsEstimate>>;
}

/// Provider of reference data.
#[async_trait]
pub trait ReferenceDataProvider: DataProvider {
    /// Fetches the company profile.
    async fn company_profile(&self, symbol: &Symbol) -> Result<CompanyProfile>;

    /// Fetches comparable companies. The result may include `symbol` itself.
    async fn peer_group(&self, symbol: &Symbol) -> Result<Vec<Symbol>>;
}
