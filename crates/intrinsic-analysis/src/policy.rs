//! Engine configuration.
//!
//! Every threshold the engines use lives in an immutable struct passed in at
//! construction. The `Default` impls carry the standard Levermann values.

use serde::{Deserialize, Serialize};

/// How multi-year diluted EPS is averaged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum EpsWeighting {
    /// Arithmetic mean of the finite values.
    #[default]
    Unweighted,
    /// Linearly increasing weights `1, 1+step, 1+2·step, ...` over the
    /// chronological series, oldest first. The newest year weighs most.
    YearWeighted {
        /// Weight increment per year.
        step: f64,
    },
}

impl EpsWeighting {
    /// The year-weighted policy with the usual step of 0.5.
    #[must_use]
    pub const fn year_weighted() -> Self {
        Self::YearWeighted { step: 0.5 }
    }
}

/// Configuration of the valuation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationPolicy {
    /// EPS averaging policy.
    pub eps_weighting: EpsWeighting,
    /// Treat an absent dividend as zero instead of an error.
    pub coerce_missing_dividend: bool,
    /// Horizon of the earnings-based fair value, in years.
    pub earnings_horizon_years: u32,
}

impl Default for ValuationPolicy {
    fn default() -> Self {
        Self {
            eps_weighting: EpsWeighting::Unweighted,
            coerce_missing_dividend: false,
            earnings_horizon_years: 10,
        }
    }
}

/// A pair of strict cut-offs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    /// Upper cut-off.
    pub high: f64,
    /// Lower cut-off.
    pub low: f64,
}

impl Band {
    /// Creates a band.
    #[must_use]
    pub const fn new(high: f64, low: f64) -> Self {
        Self { high, low }
    }

    /// +1 above `high`, -1 below `low`, else 0.
    #[must_use]
    pub fn score(&self, value: f64) -> i8 {
        if value > self.high {
            1
        } else if value < self.low {
            -1
        } else {
            0
        }
    }

    /// +1 below `low`, -1 above `high`, else 0. Used where lower is better.
    #[must_use]
    pub fn score_inverse(&self, value: f64) -> i8 {
        -self.score(value)
    }

    /// Like [`score`](Self::score) but with inclusive cut-offs.
    #[must_use]
    pub fn score_inclusive(&self, value: f64) -> i8 {
        if value >= self.high {
            1
        } else if value <= self.low {
            -1
        } else {
            0
        }
    }
}

/// Minimum scores for a buy and a hold verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictCutoffs {
    /// Minimum score for a buy.
    pub buy: i32,
    /// Minimum score for a hold.
    pub hold: i32,
}

/// Market capitalization buckets and their verdict cut-offs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketCapBuckets {
    /// Caps strictly above this are large.
    pub large_above: f64,
    /// Caps strictly below this are small.
    pub small_below: f64,
    /// Cut-offs for large caps.
    pub large: VerdictCutoffs,
    /// Cut-offs for mid caps.
    pub mid: VerdictCutoffs,
    /// Cut-offs for small caps.
    pub small: VerdictCutoffs,
}

/// Size class by market capitalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapBucket {
    /// Above the large-cap boundary.
    Large,
    /// Between the boundaries, inclusive.
    Mid,
    /// Below the small-cap boundary.
    Small,
}

impl MarketCapBuckets {
    /// Classifies a market cap.
    #[must_use]
    pub fn classify(&self, market_cap: f64) -> CapBucket {
        if market_cap > self.large_above {
            CapBucket::Large
        } else if market_cap < self.small_below {
            CapBucket::Small
        } else {
            CapBucket::Mid
        }
    }

    /// Verdict cut-offs of a bucket.
    #[must_use]
    pub const fn cutoffs(&self, bucket: CapBucket) -> VerdictCutoffs {
        match bucket {
            CapBucket::Large => self.large,
            CapBucket::Mid => self.mid,
            CapBucket::Small => self.small,
        }
    }
}

impl Default for MarketCapBuckets {
    fn default() -> Self {
        Self {
            large_above: 5.0e9,
            small_below: 2.0e9,
            large: VerdictCutoffs { buy: 4, hold: 3 },
            mid: VerdictCutoffs { buy: 7, hold: 5 },
            small: VerdictCutoffs { buy: 7, hold: 6 },
        }
    }
}

/// Cut-offs of the multi-factor score. Ratios and changes are in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringThresholds {
    /// Mean operating income over equity.
    pub return_on_equity: Band,
    /// Mean EBIT over revenue.
    pub ebit_margin: Band,
    /// Mean equity over assets.
    pub equity_ratio: Band,
    /// Price over current-year EPS estimate; lower is better.
    pub current_pe: Band,
    /// Price over five-year average EPS; lower is better.
    pub five_year_pe: Band,
    /// Mean analyst rating (1 buy, 3 sell); inclusive cut-offs.
    pub recommendation: Band,
    /// Stock minus index reaction to the last quarterly report.
    pub quarterly_reaction: Band,
    /// Six- and twelve-month price change.
    pub price_move: Band,
    /// Cut-offs of the momentum composite.
    pub momentum: Band,
    /// Growth of next-year over current-year EPS estimate.
    pub profit_growth: Band,
    /// Verdict cut-offs by market cap.
    pub market_cap: MarketCapBuckets,
}

impl Default for ScoringThresholds {
    fn default() -> Self {
        Self {
            return_on_equity: Band::new(20.0, 10.0),
            ebit_margin: Band::new(12.0, 6.0),
            equity_ratio: Band::new(25.0, 15.0),
            current_pe: Band::new(16.0, 12.0),
            five_year_pe: Band::new(16.0, 12.0),
            recommendation: Band::new(2.5, 1.5),
            quarterly_reaction: Band::new(1.0, -1.0),
            price_move: Band::new(5.0, -5.0),
            momentum: Band::new(5.0, -5.0),
            profit_growth: Band::new(5.0, -5.0),
            market_cap: MarketCapBuckets::default(),
        }
    }
}

/// Configuration of the nearest trading date search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NearestDateConfig {
    /// Maximum distance in calendar days probed in each direction.
    pub max_radius_days: u32,
}

impl Default for NearestDateConfig {
    fn default() -> Self {
        Self {
            max_radius_days: 100,
        }
    }
}
