#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/intrinsic/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Finnhub data provider.
//!
//! This crate implements the intrinsic-core traits for the
//! [Finnhub](https://finnhub.io/) REST API.
//!
//! # Usage
//!
//! ```rust,ignore
//! use intrinsic_finnhub::FinnhubProvider;
//! use intrinsic_core::{PeriodType, StatementProvider, Symbol};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = FinnhubProvider::from_env()?;
//!     let statements = provider
//!         .fetch_statements(&Symbol::new("AAPL"), PeriodType::Annual)
//!         .await?;
//!     println!("{} metrics", statements.len());
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
use intrinsic_core::{
    CompanyProfile, DataError, DataProvider, EpsEstimate, EstimatesProvider, KeyStatistics,
    PeriodType, QuoteProvider, QuoteSnapshot, RecommendationTrend, ReferenceDataProvider, Result,
    StatementProvider, StatementTable, Symbol,
};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

mod reported;

use reported::{FinancialsReported, normalize_filings};

/// Base URL for the Finnhub API.
const FINNHUB_BASE_URL: &str = "https://finnhub.io/api/v1";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "FINNHUB_API_KEY";

/// Profile values are reported in millions.
const MILLIONS: f64 = 1_000_000.0;

/// Finnhub data provider.
///
/// Provides access to:
/// - Financial statements as reported in SEC filings
/// - Real-time quote price
/// - Company profile and peers
/// - Analyst recommendation trends and annual EPS estimates
#[derive(Clone)]
pub struct FinnhubProvider {
    client: Client,
    api_key: String,
}

impl fmt::Debug for FinnhubProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinnhubProvider")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Account file holding the API key.
#[derive(Debug, Deserialize)]
struct AccountFile {
    #[serde(rename = "APIkey")]
    api_key: String,
}

impl FinnhubProvider {
    /// Create a new Finnhub provider with the given API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
        }
    }

    /// Create a new Finnhub provider with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
        }
    }

    /// Create a provider from the `FINNHUB_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(key.trim())),
            _ => Err(DataError::ProviderNotConfigured(format!(
                "Finnhub: {API_KEY_ENV} is not set"
            ))),
        }
    }

    /// Create a provider from an account file of the form `{"APIkey": "..."}`.
    pub fn from_account_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| DataError::Config(format!("{}: {e}", path.display())))?;
        let account: AccountFile = serde_json::from_str(&json)
            .map_err(|e| DataError::Config(format!("{}: {e}", path.display())))?;
        Ok(Self::new(account.api_key))
    }

    /// Build a URL with the API token appended.
    fn url(&self, endpoint: &str) -> String {
        if endpoint.contains('?') {
            format!("{FINNHUB_BASE_URL}/{endpoint}&token={}", self.api_key)
        } else {
            format!("{FINNHUB_BASE_URL}/{endpoint}?token={}", self.api_key)
        }
    }

    /// Make a GET request and parse the JSON response.
    async fn get<T: serde::de::DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let url = self.url(endpoint);
        debug!("Finnhub request: {}", endpoint);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DataError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DataError::RateLimited {
                provider: "Finnhub".to_string(),
                retry_after: None,
            });
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(DataError::AuthenticationFailed("Finnhub".to_string()));
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(DataError::Network(format!("HTTP {status}: {text}")));
        }

        let text = response
            .text()
            .await
            .map_err(|e| DataError::Network(e.to_string()))?;

        // Finnhub reports some failures as 200 with an error body
        if text.starts_with("{\"error\"") {
            return Err(DataError::Network(text));
        }

        serde_json::from_str(&text).map_err(|e| DataError::Parse(format!("{e}: {text}")))
    }

    /// Fetch the company profile from Finnhub.
    async fn fetch_profile(&self, symbol: &Symbol) -> Result<FinnhubProfile> {
        let profile: FinnhubProfile = self
            .get(&format!("stock/profile2?symbol={}", symbol.as_str()))
            .await?;
        if profile.name.is_none() && profile.ticker.is_none() {
            return Err(DataError::SymbolNotFound(symbol.to_string()));
        }
        Ok(profile)
    }
}

impl DataProvider for FinnhubProvider {
    fn name(&self) -> &str {
        "Finnhub"
    }

    fn description(&self) -> &str {
        "Finnhub - Financials as reported, quotes, analyst estimates and peers"
    }
}

#[async_trait]
impl StatementProvider for FinnhubProvider {
    async fn fetch_statements(
        &self,
        symbol: &Symbol,
        period_type: PeriodType,
    ) -> Result<StatementTable> {
        let endpoint = format!(
            "stock/financials-reported?symbol={}&freq={}",
            symbol.as_str(),
            period_type.as_query()
        );
        let reported: FinancialsReported = self.get(&endpoint).await?;

        // Non-US issuers have no SEC filings
        if reported.data.is_empty() {
            return Err(DataError::DataNotAvailable {
                symbol: symbol.to_string(),
                start: "N/A".to_string(),
                end: "N/A".to_string(),
            });
        }

        let table = normalize_filings(&reported.data);
        debug!(%symbol, filings = reported.data.len(), metrics = table.len(), "Normalized Finnhub filings");
        Ok(table)
    }
}

#[async_trait]
impl QuoteProvider for FinnhubProvider {
    async fn fetch_quote(&self, symbol: &Symbol) -> Result<QuoteSnapshot> {
        let quote_path = format!("quote?symbol={}", symbol.as_str());
        let (quote, profile) = tokio::join!(
            self.get::<FinnhubQuote>(&quote_path),
            self.fetch_profile(symbol),
        );
        let quote = quote?;
        let profile = profile
            .inspect_err(|e| warn!(%symbol, error = %e, "Finnhub profile unavailable"))
            .ok();
        Ok(quote_snapshot(&quote, profile.as_ref()))
    }
}

#[async_trait]
impl EstimatesProvider for FinnhubProvider {
    async fn recommendations(&self, symbol: &Symbol) -> Result<Vec<RecommendationTrend>> {
        let trends: Vec<FinnhubRecommendation> = self
            .get(&format!("stock/recommendation?symbol={}", symbol.as_str()))
            .await?;
        Ok(trends.into_iter().filter_map(FinnhubRecommendation::into_trend).collect())
    }

    async fn eps_estimates(&self, symbol: &Symbol) -> Result<Vec<EpsEstimate>> {
        let estimates: FinnhubEpsEstimates = self
            .get(&format!("stock/eps-estimate?symbol={}&freq=annual", symbol.as_str()))
            .await?;
        Ok(estimates
            .data
            .into_iter()
            .filter_map(FinnhubEpsEstimate::into_estimate)
            .collect())
    }
}

#[async_trait]
impl ReferenceDataProvider for FinnhubProvider {
    async fn company_profile(&self, symbol: &Symbol) -> Result<CompanyProfile> {
        let profile = self.fetch_profile(symbol).await?;
        Ok(profile.into_company_profile(symbol))
    }

    async fn peer_group(&self, symbol: &Symbol) -> Result<Vec<Symbol>> {
        let peers: Vec<String> = self
            .get(&format!("stock/peers?symbol={}", symbol.as_str()))
            .await?;
        Ok(peers.into_iter().map(Symbol::new).collect())
    }
}

fn quote_snapshot(quote: &FinnhubQuote, profile: Option<&FinnhubProfile>) -> QuoteSnapshot {
    let mut snapshot = QuoteSnapshot::default();
    // Unknown symbols quote as all zeros
    snapshot.basic.price = quote.c.filter(|c| c.is_finite() && *c > 0.0);
    if let Some(profile) = profile {
        snapshot.key_stats = KeyStatistics {
            shares_outstanding: profile.share_outstanding.map(|s| s * MILLIONS),
            market_cap: profile.market_capitalization.map(|m| m * MILLIONS),
        };
        snapshot.name.clone_from(&profile.name);
        snapshot.currency.clone_from(&profile.currency);
    }
    snapshot
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), "%Y-%m-%d").ok()
}

// ============================================================================
// Finnhub API Response Types
// ============================================================================

/// `quote` response.
#[derive(Debug, Clone, Deserialize)]
struct FinnhubQuote {
    /// Current price.
    c: Option<f64>,
}

/// `stock/profile2` response. Empty object for unknown symbols.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinnhubProfile {
    ticker: Option<String>,
    name: Option<String>,
    exchange: Option<String>,
    finnhub_industry: Option<String>,
    country: Option<String>,
    currency: Option<String>,
    market_capitalization: Option<f64>,
    share_outstanding: Option<f64>,
}

impl FinnhubProfile {
    fn into_company_profile(self, symbol: &Symbol) -> CompanyProfile {
        let mut profile = CompanyProfile::new(symbol.clone());
        profile.name = self.name;
        profile.exchange = self.exchange;
        profile.industry = self.finnhub_industry;
        profile.country = self.country;
        profile.currency = self.currency;
        profile.market_cap = self.market_capitalization.map(|m| m * MILLIONS);
        profile.shares_outstanding = self.share_outstanding.map(|s| s * MILLIONS);
        profile
    }
}

/// `stock/recommendation` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinnhubRecommendation {
    period: String,
    #[serde(default)]
    strong_buy: u32,
    #[serde(default)]
    buy: u32,
    #[serde(default)]
    hold: u32,
    #[serde(default)]
    sell: u32,
    #[serde(default)]
    strong_sell: u32,
}

impl FinnhubRecommendation {
    fn into_trend(self) -> Option<RecommendationTrend> {
        Some(RecommendationTrend {
            period: parse_date(&self.period)?,
            strong_buy: self.strong_buy,
            buy: self.buy,
            hold: self.hold,
            sell: self.sell,
            strong_sell: self.strong_sell,
        })
    }
}

/// `stock/eps-estimate` response.
#[derive(Debug, Clone, Deserialize)]
struct FinnhubEpsEstimates {
    #[serde(default)]
    data: Vec<FinnhubEpsEstimate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinnhubEpsEstimate {
    period: String,
    eps_avg: Option<f64>,
    eps_high: Option<f64>,
    eps_low: Option<f64>,
    number_analysts: Option<u32>,
}

impl FinnhubEpsEstimate {
    fn into_estimate(self) -> Option<EpsEstimate> {
        Some(EpsEstimate {
            period: parse_date(&self.period)?,
            eps_avg: self.eps_avg,
            eps_high: self.eps_high,
            eps_low: self.eps_low,
            number_analysts: self.number_analysts,
        })
    }
}
