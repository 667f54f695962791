//! Provider registry: fact table assembly and analysis runs.

use std::{future::Future, sync::Arc};

use chrono::NaiveDate;
use futures::{StreamExt, future::join_all, stream};
use tracing::{debug, instrument, warn};

use intrinsic_analysis::{AnalysisReport, Analyzer};
use intrinsic_core::{
    DataError, DataFrequency, EstimatesProvider, FinancialFactTable, InstrumentConfig, PeriodType,
    PriceHistory, PriceHistoryProvider, QuoteProvider, ReferenceDataProvider, Result,
    StatementProvider, StatementTable, Symbol, merge::merge_into,
};

use crate::options::AnalysisOptions;

/// Registry of provider adapters.
///
/// Statement and quote providers are all queried and merged in registration
/// order, so register the least authoritative source first. History,
/// estimates and reference providers are tried in order until one succeeds.
/// Every call is bounded by [`AnalysisOptions::request_timeout`]; a timed out
/// or failed adapter is treated as unavailable.
///
/// # Example
///
/// ```rust,ignore
/// use intrinsic::{ProviderRegistry, Symbol};
///
/// let registry = ProviderRegistry::standard_from_env()?;
/// let facts = registry.build_fact_table(&Symbol::new("AAPL")).await;
/// ```
#[derive(Default)]
pub struct ProviderRegistry {
    statement_providers: Vec<Arc<dyn StatementProvider>>,
    quote_providers: Vec<Arc<dyn QuoteProvider>>,
    history_providers: Vec<Arc<dyn PriceHistoryProvider>>,
    estimates_providers: Vec<Arc<dyn EstimatesProvider>>,
    reference_providers: Vec<Arc<dyn ReferenceDataProvider>>,
    options: AnalysisOptions,
    analyzer: Analyzer,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field(
                "statement_providers",
                &self.statement_providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field(
                "quote_providers",
                &self.quote_providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field(
                "history_providers",
                &self.history_providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field(
                "estimates_providers",
                &self.estimates_providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field(
                "reference_providers",
                &self.reference_providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Runs `fut` under the registry timeout, mapping an elapsed timeout to
/// [`DataError::Timeout`].
async fn timed<T>(
    timeout: std::time::Duration,
    provider: &str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(DataError::Timeout {
            provider: provider.to_string(),
            seconds: timeout.as_secs(),
        }),
    }
}

/// Peer group order: the instrument, then `extra` peers, then the provider's
/// peers, each symbol once.
#[must_use]
pub fn peer_order(instrument: &Symbol, extra: &[Symbol], provider_peers: &[Symbol]) -> Vec<Symbol> {
    let mut order = vec![instrument.clone()];
    for symbol in extra.iter().chain(provider_peers) {
        if !order.contains(symbol) {
            order.push(symbol.clone());
        }
    }
    order
}

impl ProviderRegistry {
    /// Creates an empty registry with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the run options.
    #[must_use]
    pub fn with_options(mut self, options: AnalysisOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces the analyzer.
    #[must_use]
    pub fn with_analyzer(mut self, analyzer: Analyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// The run options.
    #[must_use]
    pub const fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Register a statement provider. Later registrations win on merge.
    pub fn register_statements(&mut self, provider: Arc<dyn StatementProvider>) {
        debug!(provider = provider.name(), "Registering statement provider");
        self.statement_providers.push(provider);
    }

    /// Register a quote provider. Later registrations win on overlay.
    pub fn register_quote(&mut self, provider: Arc<dyn QuoteProvider>) {
        debug!(provider = provider.name(), "Registering quote provider");
        self.quote_providers.push(provider);
    }

    /// Register a price history provider.
    pub fn register_history(&mut self, provider: Arc<dyn PriceHistoryProvider>) {
        debug!(provider = provider.name(), "Registering history provider");
        self.history_providers.push(provider);
    }

    /// Register an analyst data provider.
    pub fn register_estimates(&mut self, provider: Arc<dyn EstimatesProvider>) {
        debug!(provider = provider.name(), "Registering estimates provider");
        self.estimates_providers.push(provider);
    }

    /// Register a reference data provider.
    pub fn register_reference(&mut self, provider: Arc<dyn ReferenceDataProvider>) {
        debug!(provider = provider.name(), "Registering reference provider");
        self.reference_providers.push(provider);
    }

    /// Fetches statements from every provider and merges them in
    /// registration order. Unavailable providers contribute nothing.
    pub async fn fetch_statements(&self, symbol: &Symbol) -> StatementTable {
        let timeout = self.options.request_timeout;
        let results = join_all(self.statement_providers.iter().map(|p| {
            timed(timeout, p.name(), p.fetch_statements(symbol, PeriodType::Annual))
        }))
        .await;

        let mut table = StatementTable::new();
        for (provider, result) in self.statement_providers.iter().zip(results) {
            match result {
                Ok(incoming) => {
                    let overwritten = merge_into(&mut table, &incoming);
                    debug!(provider = provider.name(), %symbol, overwritten, "Merged statements");
                }
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        %symbol,
                        error = %e,
                        "Statement provider unavailable"
                    );
                }
            }
        }
        table
    }

    /// Fetches price history, trying providers in order until one succeeds.
    pub async fn fetch_history(
        &self,
        symbol: &Symbol,
        start: NaiveDate,
        end: NaiveDate,
        frequency: DataFrequency,
    ) -> Result<PriceHistory> {
        if self.history_providers.is_empty() {
            return Err(DataError::ProviderNotConfigured(
                "No price history providers registered".to_string(),
            ));
        }

        let mut last_error = None;
        for provider in &self.history_providers {
            debug!(provider = provider.name(), %symbol, "Fetching price history");
            let fetch = provider.fetch_history(symbol, start, end, frequency);
            match timed(self.options.request_timeout, provider.name(), fetch).await {
                Ok(history) => return Ok(history),
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "Provider failed, trying next");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| DataError::Other("All providers failed with no error".to_string())))
    }

    /// Fetches the reference index history over the configured window.
    pub async fn fetch_index_history(&self) -> PriceHistory {
        let options = &self.options;
        self.fetch_history(
            &options.index_symbol,
            options.history_start(),
            options.as_of_date(),
            options.history_frequency,
        )
        .await
        .unwrap_or_else(|e| {
            warn!(index = %options.index_symbol, error = %e, "Index history unavailable");
            PriceHistory::default()
        })
    }

    /// Fetches the peer group of a symbol from the first reference provider
    /// that answers.
    pub async fn fetch_peers(&self, symbol: &Symbol) -> Vec<Symbol> {
        for provider in &self.reference_providers {
            let fetch = provider.peer_group(symbol);
            match timed(self.options.request_timeout, provider.name(), fetch).await {
                Ok(peers) => return peers,
                Err(e) => warn!(provider = provider.name(), error = %e, "Peer group unavailable"),
            }
        }
        Vec::new()
    }

    /// Assembles the fact table of one instrument.
    ///
    /// Never fails: each missing source leaves its part of the table empty.
    #[instrument(skip_all, fields(symbol = %symbol))]
    pub async fn build_fact_table(&self, symbol: &Symbol) -> FinancialFactTable {
        let options = &self.options;
        let timeout = options.request_timeout;

        let (statements, quotes, history) = tokio::join!(
            self.fetch_statements(symbol),
            join_all(
                self.quote_providers
                    .iter()
                    .map(|p| timed(timeout, p.name(), p.fetch_quote(symbol)))
            ),
            self.fetch_history(
                symbol,
                options.history_start(),
                options.as_of_date(),
                options.history_frequency
            ),
        );

        let mut facts = FinancialFactTable::new(symbol.clone()).with_statements(&statements);

        for provider in &self.reference_providers {
            match timed(timeout, provider.name(), provider.company_profile(symbol)).await {
                Ok(profile) => {
                    facts = facts.with_profile(&profile);
                    break;
                }
                Err(e) => warn!(provider = provider.name(), error = %e, "Profile unavailable"),
            }
        }

        for (provider, quote) in self.quote_providers.iter().zip(quotes) {
            match quote {
                Ok(quote) => facts = facts.with_quote(&quote),
                Err(e) => warn!(provider = provider.name(), error = %e, "Quote unavailable"),
            }
        }

        match history {
            Ok(history) => facts = facts.with_history(history),
            Err(e) => warn!(error = %e, "Price history unavailable"),
        }

        for provider in &self.estimates_providers {
            let (trends, estimates) = tokio::join!(
                timed(timeout, provider.name(), provider.recommendations(symbol)),
                timed(timeout, provider.name(), provider.eps_estimates(symbol)),
            );
            match (trends, estimates) {
                (Ok(trends), Ok(estimates)) => {
                    facts = facts.with_recommendations(trends).with_eps_estimates(estimates);
                    break;
                }
                (trends, estimates) => {
                    if let Err(e) = &trends {
                        warn!(provider = provider.name(), error = %e, "Recommendations unavailable");
                    }
                    if let Err(e) = &estimates {
                        warn!(provider = provider.name(), error = %e, "EPS estimates unavailable");
                    }
                    if let Ok(trends) = trends {
                        facts = facts.with_recommendations(trends);
                    }
                    if let Ok(estimates) = estimates {
                        facts = facts.with_eps_estimates(estimates);
                    }
                }
            }
        }

        debug!(
            metrics = facts.statements().len(),
            bars = facts.history().len(),
            "Fact table assembled"
        );
        facts
    }

    /// Analyzes one instrument with an explicit config.
    #[instrument(skip_all, fields(symbol = %symbol))]
    pub async fn analyze_with(
        &self,
        symbol: &Symbol,
        config: &InstrumentConfig,
        index: &PriceHistory,
    ) -> AnalysisReport {
        let facts = self.build_fact_table(symbol).await;
        self.analyzer
            .analyze(&facts, config, index, self.options.as_of_date())
    }

    /// Analyzes one instrument, loading its config from the config directory.
    pub async fn analyze(&self, symbol: &Symbol) -> AnalysisReport {
        let index = self.fetch_index_history().await;
        self.analyze_with(symbol, &self.options.config_for(symbol), &index)
            .await
    }

    /// Analyzes an instrument and its peers.
    ///
    /// Reports come back in [`peer_order`]. Instruments are analyzed
    /// concurrently, each with its own fact table.
    #[instrument(skip_all, fields(symbol = %symbol))]
    pub async fn analyze_peer_group(
        &self,
        symbol: &Symbol,
        extra_peers: &[Symbol],
    ) -> Vec<AnalysisReport> {
        let (provider_peers, index) = tokio::join!(self.fetch_peers(symbol), self.fetch_index_history());
        let order = peer_order(symbol, extra_peers, &provider_peers);
        debug!(peers = order.len(), "Analyzing peer group");

        let index = &index;
        stream::iter(order)
            .map(|peer| async move {
                let config = self.options.config_for(&peer);
                self.analyze_with(&peer, &config, index).await
            })
            .buffered(self.options.peer_concurrency.max(1))
            .collect()
            .await
    }

    // Builder methods for the bundled adapters

    /// Add the Yahoo Finance provider for statements, quotes, history and
    /// reference data.
    #[cfg(feature = "yahoo")]
    #[must_use]
    pub fn with_yahoo(mut self) -> Self {
        let provider = Arc::new(intrinsic_yahoo::YahooProvider::new());
        self.register_statements(provider.clone());
        self.register_quote(provider.clone());
        self.register_history(provider.clone());
        self.register_reference(provider);
        self
    }

    /// Add the Finnhub provider for statements, quotes, analyst data and
    /// reference data.
    #[cfg(feature = "finnhub")]
    #[must_use]
    pub fn with_finnhub(mut self, api_key: &str) -> Self {
        self.register_finnhub(intrinsic_finnhub::FinnhubProvider::new(api_key));
        self
    }

    /// Add the Finnhub provider with the key from `FINNHUB_API_KEY`.
    #[cfg(feature = "finnhub")]
    pub fn with_finnhub_from_env(mut self) -> Result<Self> {
        self.register_finnhub(intrinsic_finnhub::FinnhubProvider::from_env()?);
        Ok(self)
    }

    /// Registry with both bundled adapters in their standard order: Finnhub
    /// first, Yahoo second, so Yahoo wins where both report the same cell.
    #[cfg(all(feature = "yahoo", feature = "finnhub"))]
    #[must_use]
    pub fn standard(finnhub_api_key: &str) -> Self {
        Self::new().with_finnhub(finnhub_api_key).with_yahoo()
    }

    /// [`standard`](Self::standard) with the Finnhub key from
    /// `FINNHUB_API_KEY`.
    #[cfg(all(feature = "yahoo", feature = "finnhub"))]
    pub fn standard_from_env() -> Result<Self> {
        Ok(Self::new().with_finnhub_from_env()?.with_yahoo())
    }

    #[cfg(feature = "finnhub")]
    fn register_finnhub(&mut self, provider: intrinsic_finnhub::FinnhubProvider) {
        let provider = Arc::new(provider);
        self.register_statements(provider.clone());
        self.register_quote(provider.clone());
        self.register_estimates(provider.clone());
        self.register_reference(provider);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use intrinsic_core::{
        Assumptions, BasicData, CompanyProfile, DataProvider, EpsEstimate, FiscalPeriod,
        KeyStatistics, Metric, OhlcvBar, QuoteSnapshot, RecommendationTrend,
    };
    use polars::prelude::DataFrame;
    use std::time::Duration;

    fn fy(year: i32) -> FiscalPeriod {
        FiscalPeriod::from_ymd(year, 12, 31).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// In-process provider with canned answers. `None` answers fail.
    #[derive(Debug, Default)]
    struct MockProvider {
        name: &'static str,
        statements: Option<StatementTable>,
        quote: Option<QuoteSnapshot>,
        history: Option<PriceHistory>,
        peers: Option<Vec<Symbol>>,
        delay: Option<Duration>,
    }

    impl MockProvider {
        async fn answer<T: Clone>(&self, value: &Option<T>) -> Result<T> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            value
                .clone()
                .ok_or_else(|| DataError::Network(format!("{} unavailable", self.name)))
        }
    }

    impl DataProvider for MockProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "mock"
        }
    }

    #[async_trait]
    impl StatementProvider for MockProvider {
        async fn fetch_statements(&self, _: &Symbol, _: PeriodType) -> Result<StatementTable> {
            self.answer(&self.statements).await
        }
    }

    #[async_trait]
    impl QuoteProvider for MockProvider {
        async fn fetch_quote(&self, _: &Symbol) -> Result<QuoteSnapshot> {
            self.answer(&self.quote).await
        }
    }

    #[async_trait]
    impl PriceHistoryProvider for MockProvider {
        async fn fetch_ohlcv(
            &self,
            _: &Symbol,
            _: NaiveDate,
            _: NaiveDate,
            _: DataFrequency,
        ) -> Result<DataFrame> {
            Err(DataError::NotSupported("frames".to_string()))
        }

        async fn fetch_history(
            &self,
            _: &Symbol,
            _: NaiveDate,
            _: NaiveDate,
            _: DataFrequency,
        ) -> Result<PriceHistory> {
            self.answer(&self.history).await
        }
    }

    #[async_trait]
    impl EstimatesProvider for MockProvider {
        async fn recommendations(&self, _: &Symbol) -> Result<Vec<RecommendationTrend>> {
            Ok(vec![RecommendationTrend {
                period: date(2024, 6, 1),
                buy: 4,
                hold: 1,
                ..Default::default()
            }])
        }

        async fn eps_estimates(&self, _: &Symbol) -> Result<Vec<EpsEstimate>> {
            Err(DataError::AuthenticationFailed(self.name.to_string()))
        }
    }

    #[async_trait]
    impl ReferenceDataProvider for MockProvider {
        async fn company_profile(&self, symbol: &Symbol) -> Result<CompanyProfile> {
            let mut profile = CompanyProfile::new(symbol.clone());
            profile.name = Some(format!("{} Corp", symbol.as_str()));
            Ok(profile)
        }

        async fn peer_group(&self, _: &Symbol) -> Result<Vec<Symbol>> {
            self.answer(&self.peers).await
        }
    }

    fn complete_table() -> StatementTable {
        [
            (Metric::FreeCashFlow, fy(2019), 1.0e9),
            (Metric::FreeCashFlow, fy(2020), 1.1e9),
            (Metric::FreeCashFlow, fy(2021), 1.21e9),
            (Metric::NetIncome, fy(2021), 2.0e9),
            (Metric::TotalRevenue, fy(2021), 1.0e10),
        ]
        .into_iter()
        .collect()
    }

    fn options() -> AnalysisOptions {
        AnalysisOptions::default()
            .with_as_of(date(2024, 6, 28))
            .with_request_timeout(Duration::from_millis(200))
    }

    fn registry_with(providers: Vec<MockProvider>) -> ProviderRegistry {
        let mut registry = ProviderRegistry::new().with_options(options());
        for provider in providers {
            let provider = Arc::new(provider);
            registry.register_statements(provider.clone());
            registry.register_quote(provider.clone());
            registry.register_history(provider.clone());
            registry.register_estimates(provider.clone());
            registry.register_reference(provider);
        }
        registry
    }

    #[tokio::test]
    async fn test_unavailable_provider_is_noop_on_merge() {
        let a = MockProvider {
            name: "A",
            statements: Some(complete_table()),
            ..Default::default()
        };
        let b = MockProvider {
            name: "B",
            ..Default::default()
        };
        let registry = registry_with(vec![a, b]);
        let merged = registry.fetch_statements(&Symbol::new("TEST")).await;
        assert_eq!(merged, complete_table());
    }

    #[tokio::test]
    async fn test_statements_merge_in_registration_order() {
        let base = MockProvider {
            name: "primary",
            statements: Some(complete_table()),
            ..Default::default()
        };
        let overlay = MockProvider {
            name: "secondary",
            statements: Some(
                [
                    (Metric::NetIncome, fy(2021), 2.5e9),
                    (Metric::DilutedEps, fy(2021), 2.5),
                ]
                .into_iter()
                .collect(),
            ),
            ..Default::default()
        };
        let registry = registry_with(vec![base, overlay]);
        let merged = registry.fetch_statements(&Symbol::new("TEST")).await;
        assert_eq!(merged.get(&Metric::NetIncome, &fy(2021)), Some(2.5e9));
        assert_eq!(merged.get(&Metric::DilutedEps, &fy(2021)), Some(2.5));
        assert_eq!(merged.get(&Metric::FreeCashFlow, &fy(2019)), Some(1.0e9));
    }

    #[cfg(all(feature = "yahoo", feature = "finnhub"))]
    #[test]
    fn test_standard_registers_yahoo_last() {
        let registry = ProviderRegistry::standard("key");
        let names: Vec<_> = registry.statement_providers.iter().map(|p| p.name()).collect();
        assert_eq!(names, ["Finnhub", "Yahoo Finance"]);
        let names: Vec<_> = registry.quote_providers.iter().map(|p| p.name()).collect();
        assert_eq!(names, ["Finnhub", "Yahoo Finance"]);
    }

    #[tokio::test]
    async fn test_yahoo_overlays_finnhub_on_shared_cells() {
        let finnhub = MockProvider {
            name: "Finnhub",
            statements: Some(
                [
                    (Metric::DilutedEps, fy(2021), 1.9),
                    (Metric::FreeCashFlow, fy(2021), 1.0e9),
                    (Metric::TotalAssets, fy(2021), 5.0e10),
                ]
                .into_iter()
                .collect(),
            ),
            ..Default::default()
        };
        let yahoo = MockProvider {
            name: "Yahoo",
            statements: Some(
                [
                    (Metric::DilutedEps, fy(2021), 2.1),
                    (Metric::FreeCashFlow, fy(2021), 1.2e9),
                ]
                .into_iter()
                .collect(),
            ),
            ..Default::default()
        };
        let registry = registry_with(vec![finnhub, yahoo]);
        let merged = registry.fetch_statements(&Symbol::new("TEST")).await;
        assert_eq!(merged.get(&Metric::DilutedEps, &fy(2021)), Some(2.1));
        assert_eq!(merged.get(&Metric::FreeCashFlow, &fy(2021)), Some(1.2e9));
        assert_eq!(merged.get(&Metric::TotalAssets, &fy(2021)), Some(5.0e10));
    }

    #[tokio::test]
    async fn test_timeout_is_unavailable() {
        let slow = MockProvider {
            name: "slow",
            statements: Some(complete_table()),
            delay: Some(Duration::from_secs(5)),
            ..Default::default()
        };
        let registry = registry_with(vec![slow]);
        let merged = registry.fetch_statements(&Symbol::new("TEST")).await;
        assert!(merged.is_empty());

        let err = registry
            .fetch_history(&Symbol::new("TEST"), date(2024, 1, 1), date(2024, 6, 28), DataFrequency::Daily)
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_history_falls_back() {
        let failing = MockProvider {
            name: "failing",
            ..Default::default()
        };
        let working = MockProvider {
            name: "working",
            history: Some([OhlcvBar::flat(date(2024, 6, 28), 100.0)].into_iter().collect()),
            ..Default::default()
        };
        let registry = registry_with(vec![failing, working]);
        let history = registry
            .fetch_history(&Symbol::new("TEST"), date(2024, 1, 1), date(2024, 6, 28), DataFrequency::Daily)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);

        let empty = ProviderRegistry::new();
        assert!(matches!(
            empty
                .fetch_history(&Symbol::new("TEST"), date(2024, 1, 1), date(2024, 6, 28), DataFrequency::Daily)
                .await,
            Err(DataError::ProviderNotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn test_build_fact_table() {
        let provider = MockProvider {
            name: "A",
            statements: Some(complete_table()),
            quote: Some(QuoteSnapshot {
                basic: BasicData {
                    price: Some(20.0),
                    ..Default::default()
                },
                key_stats: KeyStatistics {
                    shares_outstanding: Some(1.0e9),
                    market_cap: Some(2.0e10),
                },
                name: None,
                currency: Some("USD".to_string()),
            }),
            ..Default::default()
        };
        let registry = registry_with(vec![provider]);
        let facts = registry.build_fact_table(&Symbol::new("TEST")).await;

        assert_eq!(facts.statements(), &complete_table());
        assert_eq!(facts.basic().price, Some(20.0));
        assert_eq!(facts.name(), "TEST Corp");
        assert_eq!(facts.currency(), Some("USD"));
        assert_eq!(facts.recommendations().len(), 1);
        assert!(facts.eps_estimates().is_empty());
        assert!(facts.history().is_empty());
    }

    #[tokio::test]
    async fn test_analyze_with_config() {
        let provider = MockProvider {
            name: "A",
            statements: Some(complete_table()),
            quote: Some(QuoteSnapshot {
                key_stats: KeyStatistics {
                    shares_outstanding: Some(1.0e9),
                    market_cap: None,
                },
                ..Default::default()
            }),
            ..Default::default()
        };
        let registry = registry_with(vec![provider]);
        let config = InstrumentConfig {
            assumptions: Assumptions::from_percent(10.0, 20.0, 8.0, 5.0, 2.0),
            ..Default::default()
        };
        let report = registry
            .analyze_with(&Symbol::new("TEST"), &config, &PriceHistory::default())
            .await;
        let dcf = report.valuation.dcf.unwrap();
        assert!((dcf.fair_value - 18.065_073_832_982_037).abs() < 1e-9);
        assert!(report.score.is_err());
    }

    #[test]
    fn test_peer_order() {
        let s = Symbol::new;
        let order = peer_order(
            &s("AAPL"),
            &[s("NOK"), s("MSFT")],
            &[s("MSFT"), s("AAPL"), s("DELL"), s("HPQ")],
        );
        assert_eq!(order, vec![s("AAPL"), s("NOK"), s("MSFT"), s("DELL"), s("HPQ")]);
    }

    #[tokio::test]
    async fn test_peer_group_continues_past_failures() {
        let provider = MockProvider {
            name: "A",
            statements: Some(complete_table()),
            peers: Some(vec![Symbol::new("PEER1"), Symbol::new("TEST"), Symbol::new("PEER2")]),
            ..Default::default()
        };
        let registry = registry_with(vec![provider]);
        let reports = registry
            .analyze_peer_group(&Symbol::new("TEST"), &[Symbol::new("EXTRA")])
            .await;
        let symbols: Vec<&str> = reports.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, ["TEST", "EXTRA", "PEER1", "PEER2"]);
        // no assumptions configured: every DCF fails, every report exists
        assert!(reports.iter().all(|r| r.valuation.dcf.is_err()));
    }

    #[tokio::test]
    async fn test_missing_peer_group_analyzes_instrument_only() {
        let registry = registry_with(vec![MockProvider {
            name: "A",
            ..Default::default()
        }]);
        let reports = registry.analyze_peer_group(&Symbol::new("TEST"), &[]).await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].name, "TEST Corp");
    }
}
