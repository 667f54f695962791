#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/intrinsic/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for per-instrument fundamental analysis.
//!
//! This crate provides the foundational abstractions shared by the provider
//! adapters and the analysis engines:
//!
//! - [`StatementTable`](table::StatementTable) - Metric × fiscal period table
//! - [`merge`](merge::merge) - Last-writer-wins overlay of statement tables
//! - [`FinancialFactTable`](facts::FinancialFactTable) - Everything known about one instrument
//! - [`StatementProvider`](provider::StatementProvider) - Financial statements per provider
//! - [`QuoteProvider`](provider::QuoteProvider) - Price and per-share basic data
//! - [`PriceHistoryProvider`](provider::PriceHistoryProvider) - OHLC history
//! - [`EstimatesProvider`](provider::EstimatesProvider) - Analyst recommendations and EPS estimates
//! - [`ReferenceDataProvider`](provider::ReferenceDataProvider) - Company profile and peers
//! - [`InstrumentConfig`](assumptions::InstrumentConfig) - Per-instrument assumptions file

/// Analyst recommendation trends and EPS estimates.
pub mod analyst;
/// Valuation assumptions and the per-instrument config file.
pub mod assumptions;
/// Error types for data and analysis operations.
pub mod error;
/// The per-instrument fact table.
pub mod facts;
/// Data frequency and period type definitions.
pub mod frequency;
/// Daily/weekly OHLC price history.
pub mod history;
/// Last-writer-wins merging of statement tables.
pub mod merge;
/// Canonical metric names.
pub mod metric;
/// Fiscal period keys.
pub mod period;
/// Provider traits for fetching instrument data.
pub mod provider;
/// Single-metric time series.
pub mod series;
/// The metric × period statement table.
pub mod table;
/// Core data types (Symbol, OHLC bar, company profile).
pub mod types;

// Re-export commonly used items at crate root
pub use analyst::{EpsEstimate, RecommendationTrend};
pub use assumptions::{Assumptions, DcfAssumptions, InstrumentConfig, ReportDate, ReportDates};
pub use error::{AnalysisError, AnalysisResult, DataError, Result};
pub use facts::{BasicData, FinancialFactTable, KeyStatistics, QuoteSnapshot};
pub use frequency::{DataFrequency, PeriodType};
pub use history::PriceHistory;
pub use merge::merge;
pub use metric::Metric;
pub use period::FiscalPeriod;
pub use provider::{
    DataProvider, EstimatesProvider, PriceHistoryProvider, QuoteProvider, ReferenceDataProvider,
    StatementProvider,
};
pub use series::MetricSeries;
pub use table::StatementTable;
pub use types::{CompanyProfile, OhlcvBar, Symbol};
