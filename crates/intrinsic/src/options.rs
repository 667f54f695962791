//! Options of an analysis run.

use chrono::{Months, NaiveDate, Utc};
use intrinsic_core::{DataFrequency, InstrumentConfig, Symbol};
use std::{path::PathBuf, time::Duration};
use tracing::warn;

/// Options of an analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Reference index for relative price factors.
    pub index_symbol: Symbol,
    /// Years of price history to fetch.
    pub history_years: u32,
    /// Bar frequency of the price history.
    pub history_frequency: DataFrequency,
    /// Timeout of every provider call.
    pub request_timeout: Duration,
    /// Instruments analyzed concurrently in a peer group.
    pub peer_concurrency: usize,
    /// Analysis date; today when unset.
    pub as_of: Option<NaiveDate>,
    /// Directory of `<SYMBOL>.json` instrument configs.
    pub config_dir: Option<PathBuf>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            index_symbol: Symbol::new("^GSPC"),
            history_years: 5,
            history_frequency: DataFrequency::Daily,
            request_timeout: Duration::from_secs(30),
            peer_concurrency: 4,
            as_of: None,
            config_dir: None,
        }
    }
}

impl AnalysisOptions {
    /// Sets the analysis date.
    #[must_use]
    pub const fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }

    /// Sets the instrument config directory.
    #[must_use]
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    /// Sets the provider call timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Analysis date.
    #[must_use]
    pub fn as_of_date(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Utc::now().date_naive())
    }

    /// First day of the price history window.
    #[must_use]
    pub fn history_start(&self) -> NaiveDate {
        let as_of = self.as_of_date();
        as_of
            .checked_sub_months(Months::new(12 * self.history_years))
            .unwrap_or(NaiveDate::MIN)
    }

    /// Loads the config of a symbol. A missing directory, a missing file or
    /// an unreadable file all yield an empty config.
    #[must_use]
    pub fn config_for(&self, symbol: &Symbol) -> InstrumentConfig {
        let Some(dir) = &self.config_dir else {
            return InstrumentConfig::default();
        };
        InstrumentConfig::load_for(dir, symbol).unwrap_or_else(|e| {
            warn!(%symbol, error = %e, "Ignoring unreadable instrument config");
            InstrumentConfig::default()
        })
    }
}
