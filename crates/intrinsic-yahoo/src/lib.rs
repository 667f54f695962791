#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/intrinsic/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Yahoo Finance data provider.
//!
//! This crate provides a Yahoo Finance adapter that implements the
//! [`StatementProvider`], [`QuoteProvider`], [`PriceHistoryProvider`] and
//! [`ReferenceDataProvider`] traits from `intrinsic-core`.
//!
//! # Example
//!
//! ```no_run
//! use intrinsic_yahoo::YahooProvider;
//! use intrinsic_core::{PeriodType, StatementProvider, Symbol};
//!
//! # async fn example() -> intrinsic_core::Result<()> {
//! let provider = YahooProvider::new();
//! let statements = provider
//!     .fetch_statements(&Symbol::new("AAPL"), PeriodType::Annual)
//!     .await?;
//! println!("{} metrics", statements.len());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use intrinsic_core::{
    BasicData, CompanyProfile, DataError, DataFrequency, DataProvider, KeyStatistics, PeriodType,
    PriceHistoryProvider, QuoteProvider, QuoteSnapshot, ReferenceDataProvider, Result,
    StatementProvider, StatementTable, Symbol, merge::merge_all,
};
use polars::prelude::*;
use serde::{Deserialize, de::DeserializeOwned};
use tokio::time::sleep;
use tracing::{debug, warn};

mod statements;

use statements::{StatementKind, parse_statement, parse_timeseries, statement_modules, timeseries_types};

/// Yahoo Finance chart API base URL.
const CHART_API_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance quote summary API base URL.
const QUOTE_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";

/// Yahoo Finance fundamentals time series API base URL.
const TIMESERIES_URL: &str =
    "https://query2.finance.yahoo.com/ws/fundamentals-timeseries/v1/finance/timeseries";

/// Earliest timestamp requested from the fundamentals time series.
const TIMESERIES_START: i64 = 493_590_046;

/// Default rate limit delay in milliseconds.
const DEFAULT_RATE_LIMIT_MS: u64 = 1000;

/// User agent for HTTP requests.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

const PROVIDER_NAME: &str = "Yahoo Finance";

/// Yahoo Finance data provider.
#[derive(Debug)]
pub struct YahooProvider {
    client: reqwest::Client,
    rate_limit_ms: u64,
    last_request_time: AtomicU64,
}

impl YahooProvider {
    /// Create a new Yahoo Finance provider with default settings.
    ///
    /// Uses built-in rate limiting of 1 request per second.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rate_limit(Duration::from_millis(DEFAULT_RATE_LIMIT_MS))
    }

    /// Create a new Yahoo Finance provider with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            rate_limit_ms: DEFAULT_RATE_LIMIT_MS,
            last_request_time: AtomicU64::new(0),
        }
    }

    /// Create a new Yahoo Finance provider with custom rate limiting.
    #[must_use]
    pub fn with_rate_limit(rate_limit: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            rate_limit_ms: rate_limit.as_millis() as u64,
            last_request_time: AtomicU64::new(0),
        }
    }

    /// Apply rate limiting before making a request.
    async fn apply_rate_limit(&self) {
        let now = now_millis();
        let last = self.last_request_time.load(Ordering::Relaxed);
        let elapsed = now.saturating_sub(last);

        if elapsed < self.rate_limit_ms {
            let wait_time = self.rate_limit_ms - elapsed;
            debug!("Rate limiting: waiting {}ms", wait_time);
            sleep(Duration::from_millis(wait_time)).await;
        }

        self.last_request_time.store(now_millis(), Ordering::Relaxed);
    }

    /// Make a rate-limited GET request and parse the JSON response.
    async fn get<T: DeserializeOwned>(&self, url: &str, symbol: &Symbol) -> Result<T> {
        self.apply_rate_limit().await;
        debug!("Yahoo request: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DataError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DataError::RateLimited {
                provider: PROVIDER_NAME.to_string(),
                retry_after: Some(Duration::from_secs(60)),
            });
        }

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::SymbolNotFound(symbol.to_string()));
        }

        if !response.status().is_success() {
            return Err(DataError::Network(format!(
                "HTTP {} for {}",
                response.status(),
                symbol
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| DataError::Parse(e.to_string()))
    }

    /// Build the chart API URL for a symbol and date range.
    fn build_chart_url(
        &self,
        symbol: &Symbol,
        start: NaiveDate,
        end: NaiveDate,
        frequency: DataFrequency,
    ) -> String {
        let start_ts = start
            .and_hms_opt(0, 0, 0)
            .map(|dt| Utc.from_utc_datetime(&dt).timestamp())
            .unwrap_or(0);

        let end_ts = end
            .and_hms_opt(23, 59, 59)
            .map(|dt| Utc.from_utc_datetime(&dt).timestamp())
            .unwrap_or(0);

        format!(
            "{}/{}?period1={}&period2={}&interval={}",
            CHART_API_URL,
            symbol.as_str(),
            start_ts,
            end_ts,
            frequency.interval()
        )
    }

    fn build_quote_summary_url(&self, symbol: &Symbol, modules: &str) -> String {
        format!("{QUOTE_SUMMARY_URL}/{}?modules={modules}", symbol.as_str())
    }

    fn build_timeseries_url(&self, symbol: &Symbol, period_type: PeriodType) -> String {
        format!(
            "{TIMESERIES_URL}/{sym}?symbol={sym}&type={types}&period1={TIMESERIES_START}&period2={end}",
            sym = symbol.as_str(),
            types = timeseries_types(period_type),
            end = Utc::now().timestamp(),
        )
    }

    /// Fetch quote summary modules for a symbol.
    async fn fetch_quote_summary(&self, symbol: &Symbol, modules: &str) -> Result<QuoteSummaryData> {
        let url = self.build_quote_summary_url(symbol, modules);
        let summary: QuoteSummaryResponse = self.get(&url, symbol).await?;

        if let Some(error) = summary.quote_summary.error {
            if error.code == "Not Found" {
                return Err(DataError::SymbolNotFound(symbol.to_string()));
            }
            return Err(DataError::Other(format!("{}: {}", error.code, error.description)));
        }

        summary
            .quote_summary
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| DataError::SymbolNotFound(symbol.to_string()))
    }

    /// Fetch the fundamentals time series extension fields.
    async fn fetch_timeseries(&self, symbol: &Symbol, period_type: PeriodType) -> Result<StatementTable> {
        let url = self.build_timeseries_url(symbol, period_type);
        let response: serde_json::Value = self.get(&url, symbol).await?;
        Ok(parse_timeseries(&response, period_type))
    }
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn description(&self) -> &str {
        "Yahoo Finance data provider for price history, quotes and financial statements"
    }
}

#[async_trait]
impl StatementProvider for YahooProvider {
    async fn fetch_statements(
        &self,
        symbol: &Symbol,
        period_type: PeriodType,
    ) -> Result<StatementTable> {
        let data = self
            .fetch_quote_summary(symbol, &statement_modules(period_type))
            .await?;
        let mut tables: Vec<StatementTable> = StatementKind::ALL
            .iter()
            .map(|kind| {
                data.modules
                    .get(kind.module(period_type))
                    .map(|module| parse_statement(module, *kind))
                    .unwrap_or_default()
            })
            .collect();

        // The extension is an overlay; the statements stand without it.
        match self.fetch_timeseries(symbol, period_type).await {
            Ok(extension) => tables.push(extension),
            Err(e) => warn!(%symbol, error = %e, "Fundamentals time series unavailable"),
        }

        let merged = merge_all(&tables);
        if merged.is_empty() {
            return Err(DataError::DataNotAvailable {
                symbol: symbol.to_string(),
                start: "N/A".to_string(),
                end: "N/A".to_string(),
            });
        }
        debug!(%symbol, metrics = merged.len(), "Fetched Yahoo statements");
        Ok(merged)
    }
}

#[async_trait]
impl QuoteProvider for YahooProvider {
    async fn fetch_quote(&self, symbol: &Symbol) -> Result<QuoteSnapshot> {
        let data = self
            .fetch_quote_summary(symbol, "price,summaryDetail,defaultKeyStatistics")
            .await?;
        Ok(data.quote_snapshot())
    }
}

#[async_trait]
impl PriceHistoryProvider for YahooProvider {
    async fn fetch_ohlcv(
        &self,
        symbol: &Symbol,
        start: NaiveDate,
        end: NaiveDate,
        frequency: DataFrequency,
    ) -> Result<DataFrame> {
        if start > end {
            return Err(DataError::InvalidParameter(format!(
                "Start date {} is after end date {}",
                start, end
            )));
        }

        let url = self.build_chart_url(symbol, start, end, frequency);
        let chart_response: ChartResponse = self.get(&url, symbol).await?;

        if let Some(error) = chart_response.chart.error {
            if error.code == "Not Found" {
                return Err(DataError::SymbolNotFound(symbol.to_string()));
            }
            return Err(DataError::Other(format!(
                "{}: {}",
                error.code, error.description
            )));
        }

        parse_chart_response(symbol, start, end, chart_response)
    }
}

#[async_trait]
impl ReferenceDataProvider for YahooProvider {
    async fn company_profile(&self, symbol: &Symbol) -> Result<CompanyProfile> {
        let data = self
            .fetch_quote_summary(symbol, "assetProfile,price,defaultKeyStatistics")
            .await?;
        Ok(data.company_profile(symbol))
    }

    async fn peer_group(&self, symbol: &Symbol) -> Result<Vec<Symbol>> {
        warn!("Peer lookup not supported by Yahoo Finance: {}", symbol);
        Err(DataError::NotSupported(
            "Peer lookup is not supported by Yahoo Finance".to_string(),
        ))
    }
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Parse a chart response into a DataFrame.
fn parse_chart_response(
    symbol: &Symbol,
    start: NaiveDate,
    end: NaiveDate,
    response: ChartResponse,
) -> Result<DataFrame> {
    let result = response
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| DataError::SymbolNotFound(symbol.to_string()))?;

    let timestamps = result.timestamp.unwrap_or_default();
    if timestamps.is_empty() {
        return Err(DataError::DataNotAvailable {
            symbol: symbol.to_string(),
            start: start.to_string(),
            end: end.to_string(),
        });
    }

    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| DataError::Parse("Missing quote data".to_string()))?;

    let epoch = NaiveDate::default();
    let dates: Vec<Option<i32>> = timestamps
        .iter()
        .map(|&ts| {
            Utc.timestamp_opt(ts, 0)
                .single()
                .map(|dt| (dt.date_naive() - epoch).num_days() as i32)
        })
        .collect();

    let date_col = Column::new("date".into(), dates)
        .cast(&DataType::Date)
        .map_err(|e| DataError::Other(e.to_string()))?;

    DataFrame::new(vec![
        Column::new("symbol".into(), vec![symbol.as_str(); timestamps.len()]),
        date_col,
        Column::new("open".into(), quote.open),
        Column::new("high".into(), quote.high),
        Column::new("low".into(), quote.low),
        Column::new("close".into(), quote.close),
        Column::new("volume".into(), quote.volume),
    ])
    .map_err(|e| DataError::Other(e.to_string()))
}

// ============================================================================
// Yahoo Finance API Response Types
// ============================================================================

/// Chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

/// Quote Summary API response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResponse {
    quote_summary: QuoteSummaryResult,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResult {
    result: Option<Vec<QuoteSummaryData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryData {
    price: Option<PriceModule>,
    summary_detail: Option<SummaryDetail>,
    default_key_statistics: Option<DefaultKeyStatistics>,
    asset_profile: Option<AssetProfile>,
    /// Every other module, statement histories included.
    #[serde(flatten)]
    modules: HashMap<String, serde_json::Value>,
}

impl QuoteSummaryData {
    fn quote_snapshot(&self) -> QuoteSnapshot {
        let price = self.price.as_ref();
        let detail = self.summary_detail.as_ref();
        let stats = self.default_key_statistics.as_ref();

        let basic = BasicData {
            price: price.and_then(|p| raw(&p.regular_market_price)),
            trailing_eps: stats.and_then(|s| raw(&s.trailing_eps)),
            forward_eps: stats.and_then(|s| raw(&s.forward_eps)),
            trailing_pe: detail.and_then(|d| raw(&d.trailing_pe)),
            forward_pe: detail
                .and_then(|d| raw(&d.forward_pe))
                .or_else(|| stats.and_then(|s| raw(&s.forward_pe))),
            dividend_rate: detail.and_then(|d| raw(&d.dividend_rate)),
            book_value_per_share: stats.and_then(|s| raw(&s.book_value)),
        };
        let key_stats = KeyStatistics {
            shares_outstanding: stats.and_then(|s| raw(&s.shares_outstanding)),
            market_cap: price
                .and_then(|p| raw(&p.market_cap))
                .or_else(|| detail.and_then(|d| raw(&d.market_cap))),
        };

        QuoteSnapshot {
            basic,
            key_stats,
            name: price.and_then(PriceModule::display_name),
            currency: price.and_then(|p| p.currency.clone()),
        }
    }

    fn company_profile(&self, symbol: &Symbol) -> CompanyProfile {
        let price = self.price.as_ref();
        let asset = self.asset_profile.as_ref();
        let mut profile = CompanyProfile::new(symbol.clone());
        profile.name = price.and_then(PriceModule::display_name);
        profile.exchange = price.and_then(|p| p.exchange_name.clone());
        profile.industry = asset.and_then(|a| a.industry.clone());
        profile.country = asset.and_then(|a| a.country.clone());
        profile.currency = price.and_then(|p| p.currency.clone());
        profile.market_cap = price.and_then(|p| raw(&p.market_cap));
        profile.shares_outstanding = self
            .default_key_statistics
            .as_ref()
            .and_then(|s| raw(&s.shares_outstanding));
        profile
    }
}

/// A numeric field in Yahoo's `{"raw": .., "fmt": ..}` shape. Yahoo sends
/// `{}` for values it does not have.
#[derive(Debug, Default, Deserialize)]
struct RawValue {
    raw: Option<f64>,
}

fn raw(value: &Option<RawValue>) -> Option<f64> {
    value.as_ref().and_then(|v| v.raw).filter(|v| v.is_finite())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    regular_market_price: Option<RawValue>,
    market_cap: Option<RawValue>,
    long_name: Option<String>,
    short_name: Option<String>,
    currency: Option<String>,
    exchange_name: Option<String>,
}

impl PriceModule {
    fn display_name(&self) -> Option<String> {
        self.long_name.clone().or_else(|| self.short_name.clone())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDetail {
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<RawValue>,
    #[serde(rename = "forwardPE")]
    forward_pe: Option<RawValue>,
    dividend_rate: Option<RawValue>,
    market_cap: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DefaultKeyStatistics {
    trailing_eps: Option<RawValue>,
    forward_eps: Option<RawValue>,
    #[serde(rename = "forwardPE")]
    forward_pe: Option<RawValue>,
    book_value: Option<RawValue>,
    shares_outstanding: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetProfile {
    industry: Option<String>,
    country: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use intrinsic_core::{Metric, PriceHistory};

    const QUOTE_SUMMARY: &str = r#"{
        "quoteSummary": {
            "result": [{
                "price": {
                    "regularMarketPrice": {"raw": 189.5, "fmt": "189.50"},
                    "marketCap": {"raw": 2950000000000, "fmt": "2.95T"},
                    "longName": "Apple Inc.",
                    "currency": "USD",
                    "exchangeName": "NasdaqGS"
                },
                "summaryDetail": {
                    "trailingPE": {"raw": 29.4},
                    "forwardPE": {},
                    "dividendRate": {"raw": 0.96}
                },
                "defaultKeyStatistics": {
                    "trailingEps": {"raw": 6.43},
                    "forwardEps": {"raw": 7.1},
                    "forwardPE": {"raw": 26.7},
                    "bookValue": {"raw": 4.79},
                    "sharesOutstanding": {"raw": 15550000000}
                },
                "assetProfile": {"industry": "Consumer Electronics", "country": "United States"},
                "incomeStatementHistory": {
                    "incomeStatementHistory": [{
                        "endDate": {"raw": 1695945600, "fmt": "2023-09-29"},
                        "netIncome": {"raw": 96995000000}
                    }]
                }
            }],
            "error": null
        }
    }"#;

    fn summary() -> QuoteSummaryData {
        let response: QuoteSummaryResponse = serde_json::from_str(QUOTE_SUMMARY).unwrap();
        response.quote_summary.result.unwrap().into_iter().next().unwrap()
    }

    #[test]
    fn test_build_chart_url() {
        let provider = YahooProvider::new();
        let symbol = Symbol::new("AAPL");
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();

        let url = provider.build_chart_url(&symbol, start, end, DataFrequency::Weekly);

        assert!(url.contains("AAPL"));
        assert!(url.contains("interval=1wk"));
        assert!(url.contains("period1=1704067200"));
    }

    #[test]
    fn test_build_timeseries_url() {
        let provider = YahooProvider::new();
        let url = provider.build_timeseries_url(&Symbol::new("AAPL"), PeriodType::Annual);
        assert!(url.starts_with(TIMESERIES_URL));
        assert!(url.contains("type=annualDilutedEPS,annualBasicEPS"));
    }

    #[test]
    fn test_quote_snapshot() {
        let quote = summary().quote_snapshot();
        assert_eq!(quote.basic.price, Some(189.5));
        assert_eq!(quote.basic.trailing_eps, Some(6.43));
        assert_eq!(quote.basic.trailing_pe, Some(29.4));
        // summaryDetail has no forward P/E, key statistics does
        assert_eq!(quote.basic.forward_pe, Some(26.7));
        assert_eq!(quote.basic.dividend_rate, Some(0.96));
        assert_eq!(quote.basic.book_value_per_share, Some(4.79));
        assert_eq!(quote.key_stats.shares_outstanding, Some(15_550_000_000.0));
        assert_eq!(quote.key_stats.market_cap, Some(2_950_000_000_000.0));
        assert_eq!(quote.name.as_deref(), Some("Apple Inc."));
        assert_eq!(quote.currency.as_deref(), Some("USD"));
    }

    #[test]
    fn test_company_profile() {
        let profile = summary().company_profile(&Symbol::new("AAPL"));
        assert_eq!(profile.name.as_deref(), Some("Apple Inc."));
        assert_eq!(profile.exchange.as_deref(), Some("NasdaqGS"));
        assert_eq!(profile.industry.as_deref(), Some("Consumer Electronics"));
        assert_eq!(profile.shares_outstanding, Some(15_550_000_000.0));
    }

    #[test]
    fn test_statement_modules_are_flattened() {
        let data = summary();
        let module = data.modules.get("incomeStatementHistory").unwrap();
        let table = parse_statement(module, StatementKind::IncomeStatement);
        assert!(table.contains(&Metric::NetIncome));
        assert!(!data.modules.contains_key("price"));
    }

    #[test]
    fn test_parse_chart_response() {
        let json = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1704205800, 1704292200, 1704378600],
                    "indicators": {
                        "quote": [{
                            "open": [187.15, 184.22, null],
                            "high": [188.44, 185.88, 183.09],
                            "low": [183.89, 183.43, 180.88],
                            "close": [185.64, 184.25, null],
                            "volume": [82488700, 58414500, 71983600]
                        }]
                    }
                }],
                "error": null
            }
        }"#;
        let response: ChartResponse = serde_json::from_str(json).unwrap();
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 4).unwrap();
        let df = parse_chart_response(&Symbol::new("AAPL"), start, end, response).unwrap();
        assert_eq!(df.height(), 3);

        let history = PriceHistory::from_frame(&df).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.close_on(start), Some(185.64));
    }

    #[test]
    fn test_empty_chart_is_not_available() {
        let json = r#"{"chart": {"result": [{"timestamp": null, "indicators": {"quote": [{"open": [], "high": [], "low": [], "close": [], "volume": []}]}}], "error": null}}"#;
        let response: ChartResponse = serde_json::from_str(json).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert!(matches!(
            parse_chart_response(&Symbol::new("AAPL"), day, day, response),
            Err(DataError::DataNotAvailable { .. })
        ));
    }

    #[test]
    fn test_provider_info() {
        let provider = YahooProvider::default();
        assert_eq!(provider.name(), "Yahoo Finance");
        assert!(!provider.description().is_empty());
    }
}
