//! Error types for data and analysis operations.
//!
//! This module defines [`DataError`], which covers everything that can go wrong
//! while fetching or parsing provider data, and [`AnalysisError`], which covers
//! the failure modes of the valuation and scoring computations.

use chrono::NaiveDate;
use thiserror::Error;

use crate::metric::Metric;

/// Errors that can occur while fetching or parsing provider data.
///
/// A statement adapter failing with any of these is treated as "provider
/// unavailable": it contributes an empty table to the merge.
#[derive(Error, Debug)]
pub enum DataError {
    /// Network-related errors (connection failures, HTTP errors, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// The request did not complete within the configured timeout.
    #[error("Request to {provider} timed out after {seconds}s")]
    Timeout {
        /// The provider that timed out.
        provider: String,
        /// The timeout that elapsed, in seconds.
        seconds: u64,
    },

    /// Rate limit exceeded by a provider.
    #[error("Rate limited by {provider}: retry after {retry_after:?}")]
    RateLimited {
        /// The provider that rate limited the request.
        provider: String,
        /// Suggested time to wait before retrying.
        retry_after: Option<std::time::Duration>,
    },

    /// The requested symbol was not found.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// Data is not available for the requested symbol and date range.
    #[error("Data not available for {symbol} in range {start} to {end}")]
    DataNotAvailable {
        /// The symbol that was requested.
        symbol: String,
        /// Start of the requested date range.
        start: String,
        /// End of the requested date range.
        end: String,
    },

    /// Error parsing data from a provider.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The requested provider is not configured.
    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Authentication failed for a provider.
    #[error("Authentication failed for provider {0}")]
    AuthenticationFailed(String),

    /// The requested feature is not supported.
    #[error("Feature not supported: {0}")]
    NotSupported(String),

    /// Reading or writing a configuration file failed.
    #[error("Config error: {0}")]
    Config(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

/// Result type alias using [`DataError`].
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors raised by the valuation and scoring engines.
///
/// Each variant is fatal only to the computation that raised it; the rest of
/// an analysis run proceeds.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// A required canonical metric is absent from the fact table.
    #[error("Missing metric '{metric}' ({scope})")]
    MissingMetric {
        /// The metric that is missing.
        metric: Metric,
        /// What the metric was needed for, or which years were searched.
        scope: String,
    },

    /// One or more of the five DCF assumptions are absent.
    #[error("Incomplete assumptions, missing: {}", missing.join(", "))]
    IncompleteAssumptions {
        /// Config keys of the missing assumptions.
        missing: Vec<&'static str>,
    },

    /// The discount rate does not exceed the perpetuity growth rate.
    #[error(
        "Degenerate DCF: discount rate {discount_rate}% must exceed perpetuity growth {perpetual_growth}%"
    )]
    DegenerateDcf {
        /// Discount rate in percent.
        discount_rate: f64,
        /// Perpetuity growth rate in percent.
        perpetual_growth: f64,
    },

    /// No trading date was found within the search radius.
    #[error("No trading date within {max_radius_days} days of {target}")]
    DateLookupFailure {
        /// The calendar date that was looked up.
        target: NaiveDate,
        /// Search radius in days.
        max_radius_days: u32,
    },

    /// A scalar basic-data field (price, EPS, book value, ...) is absent.
    #[error("Missing basic data: {0}")]
    MissingBasicData(&'static str),

    /// The data exists but is not sufficient for the computation.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),
}

/// Result type alias using [`AnalysisError`].
pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;
