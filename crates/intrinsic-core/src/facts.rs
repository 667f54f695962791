//! The per-instrument fact table.
//!
//! A [`FinancialFactTable`] is assembled once per analysis run from the
//! output of every provider adapter and is read-only afterwards. Scalar data
//! uses typed optional fields so absence is visible in the type.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    analyst::{EpsEstimate, RecommendationTrend},
    error::{AnalysisError, AnalysisResult},
    history::PriceHistory,
    merge::merge_into,
    table::StatementTable,
    types::{CompanyProfile, Symbol},
};

/// Per-share market data.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicData {
    /// Current market price.
    pub price: Option<f64>,
    /// Trailing twelve-month EPS.
    pub trailing_eps: Option<f64>,
    /// Forward EPS.
    pub forward_eps: Option<f64>,
    /// Trailing P/E.
    pub trailing_pe: Option<f64>,
    /// Forward P/E.
    pub forward_pe: Option<f64>,
    /// Annual dividend per share.
    pub dividend_rate: Option<f64>,
    /// Book value per share.
    pub book_value_per_share: Option<f64>,
}

impl BasicData {
    /// Scalar EPS: trailing, else forward.
    #[must_use]
    pub fn eps(&self) -> Option<f64> {
        finite(self.trailing_eps).or_else(|| finite(self.forward_eps))
    }

    /// P/E: forward when present and finite, else trailing.
    #[must_use]
    pub fn pe(&self) -> Option<f64> {
        finite(self.forward_pe).or_else(|| finite(self.trailing_pe))
    }

    /// Dividend per share.
    ///
    /// An absent dividend is an error unless `coerce_missing` is set, in which
    /// case it reads as zero.
    pub fn dividend(&self, coerce_missing: bool) -> AnalysisResult<f64> {
        match finite(self.dividend_rate) {
            Some(d) => Ok(d),
            None if coerce_missing => Ok(0.0),
            None => Err(AnalysisError::MissingBasicData("dividend rate")),
        }
    }

    /// Dividend yield as a fraction of the price.
    pub fn dividend_yield(&self, coerce_missing: bool) -> AnalysisResult<f64> {
        let dividend = self.dividend(coerce_missing)?;
        let price = finite(self.price)
            .filter(|p| *p > 0.0)
            .ok_or(AnalysisError::MissingBasicData("price"))?;
        Ok(dividend / price)
    }

    /// Overwrites every field that `other` has.
    pub fn overlay(&mut self, other: &Self) {
        overlay_field(&mut self.price, other.price);
        overlay_field(&mut self.trailing_eps, other.trailing_eps);
        overlay_field(&mut self.forward_eps, other.forward_eps);
        overlay_field(&mut self.trailing_pe, other.trailing_pe);
        overlay_field(&mut self.forward_pe, other.forward_pe);
        overlay_field(&mut self.dividend_rate, other.dividend_rate);
        overlay_field(&mut self.book_value_per_share, other.book_value_per_share);
    }
}

/// Instrument-level statistics.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyStatistics {
    /// Shares outstanding.
    pub shares_outstanding: Option<f64>,
    /// Market capitalization in currency units.
    pub market_cap: Option<f64>,
}

impl KeyStatistics {
    /// Overwrites every field that `other` has.
    pub fn overlay(&mut self, other: &Self) {
        overlay_field(&mut self.shares_outstanding, other.shares_outstanding);
        overlay_field(&mut self.market_cap, other.market_cap);
    }
}

/// What a quote provider knows about an instrument right now.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    /// Per-share market data.
    pub basic: BasicData,
    /// Shares outstanding and market cap.
    pub key_stats: KeyStatistics,
    /// Display name.
    pub name: Option<String>,
    /// Trading currency.
    pub currency: Option<String>,
}

/// Everything known about one instrument for one analysis run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialFactTable {
    symbol: Symbol,
    name: Option<String>,
    currency: Option<String>,
    statements: StatementTable,
    basic: BasicData,
    key_stats: KeyStatistics,
    history: PriceHistory,
    recommendations: Vec<RecommendationTrend>,
    eps_estimates: Vec<EpsEstimate>,
}

impl FinancialFactTable {
    /// Creates an empty fact table for a symbol.
    #[must_use]
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            ..Default::default()
        }
    }

    /// Merges a statement table on top of the current statements.
    ///
    /// Call in order of increasing authority; the last table wins conflicts.
    #[must_use]
    pub fn with_statements(mut self, table: &StatementTable) -> Self {
        let overwritten = merge_into(&mut self.statements, table);
        debug!(symbol = %self.symbol, overwritten, "Added statements to fact table");
        self
    }

    /// Overlays a quote snapshot; present fields win.
    #[must_use]
    pub fn with_quote(mut self, quote: &QuoteSnapshot) -> Self {
        self.basic.overlay(&quote.basic);
        self.key_stats.overlay(&quote.key_stats);
        if quote.name.is_some() {
            self.name.clone_from(&quote.name);
        }
        if quote.currency.is_some() {
            self.currency.clone_from(&quote.currency);
        }
        self
    }

    /// Overlays the name, currency and key statistics of a company profile.
    #[must_use]
    pub fn with_profile(self, profile: &CompanyProfile) -> Self {
        self.with_quote(&QuoteSnapshot {
            basic: BasicData::default(),
            key_stats: KeyStatistics {
                shares_outstanding: profile.shares_outstanding,
                market_cap: profile.market_cap,
            },
            name: profile.name.clone(),
            currency: profile.currency.clone(),
        })
    }

    /// Sets the price history.
    #[must_use]
    pub fn with_history(mut self, history: PriceHistory) -> Self {
        self.history = history;
        self
    }

    /// Sets the analyst recommendation trends.
    #[must_use]
    pub fn with_recommendations(mut self, trends: Vec<RecommendationTrend>) -> Self {
        self.recommendations = trends;
        self
    }

    /// Sets the EPS estimates.
    #[must_use]
    pub fn with_eps_estimates(mut self, estimates: Vec<EpsEstimate>) -> Self {
        self.eps_estimates = estimates;
        self
    }

    /// Overrides single basic-data fields after the providers ran.
    #[must_use]
    pub fn with_basic(mut self, basic: &BasicData) -> Self {
        self.basic.overlay(basic);
        self
    }

    /// Overrides key statistics after the providers ran.
    #[must_use]
    pub fn with_key_stats(mut self, stats: &KeyStatistics) -> Self {
        self.key_stats.overlay(stats);
        self
    }

    /// The instrument symbol.
    #[must_use]
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// The display name, falling back to the symbol.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.symbol.as_str())
    }

    /// The trading currency.
    #[must_use]
    pub fn currency(&self) -> Option<&str> {
        self.currency.as_deref()
    }

    /// The merged statements.
    #[must_use]
    pub fn statements(&self) -> &StatementTable {
        &self.statements
    }

    /// Per-share market data.
    #[must_use]
    pub fn basic(&self) -> &BasicData {
        &self.basic
    }

    /// Shares outstanding and market cap.
    #[must_use]
    pub fn key_stats(&self) -> &KeyStatistics {
        &self.key_stats
    }

    /// The price history.
    #[must_use]
    pub fn history(&self) -> &PriceHistory {
        &self.history
    }

    /// The analyst recommendation trends.
    #[must_use]
    pub fn recommendations(&self) -> &[RecommendationTrend] {
        &self.recommendations
    }

    /// The EPS estimates.
    #[must_use]
    pub fn eps_estimates(&self) -> &[EpsEstimate] {
        &self.eps_estimates
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn overlay_field(field: &mut Option<f64>, incoming: Option<f64>) {
    if let Some(v) = finite(incoming) {
        *field = Some(v);
    }
}
