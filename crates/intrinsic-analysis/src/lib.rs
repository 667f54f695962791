#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/intrinsic/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Nearest trading date lookup.
pub mod nearest_date;

/// Engine configuration.
pub mod policy;

/// Profitability ratios.
pub mod profitability;

/// Analysis report and formatter.
pub mod report;

/// Multi-factor score.
pub mod scoring;

/// Valuation engine.
pub mod valuation;

pub use policy::{
    Band, CapBucket, EpsWeighting, MarketCapBuckets, NearestDateConfig, ScoringThresholds,
    ValuationPolicy, VerdictCutoffs,
};
pub use profitability::{Assessment, ProfitabilityRatio, RatioKind};
pub use report::{AnalysisReport, Analyzer, ReportFormatter, TextReportFormatter};
pub use scoring::{
    FactorScore, Reversal, ScoreCard, ScoreFactor, ScoreInputs, ScoringEngine, Verdict,
    score_from_inputs,
};
pub use valuation::{DcfValuation, DcfYear, Valuation, ValuationEngine};
