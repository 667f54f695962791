#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/intrinsic/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Per-company fundamental analysis.
//!
//! This crate re-exports the data model of `intrinsic-core`, the engines of
//! `intrinsic-analysis` and the bundled provider adapters, and provides a
//! [`ProviderRegistry`] that assembles one fact table per instrument from
//! every registered provider and runs single-instrument and peer-group
//! analyses.
//!
//! # Features
//!
//! - `yahoo` - Yahoo Finance provider for statements, quotes, history and reference data
//! - `finnhub` - Finnhub provider for reported financials, quotes and analyst data

// Core types and traits
pub use intrinsic_core::*;

// Engines
pub use intrinsic_analysis::{
    AnalysisReport, Analyzer, CapBucket, DcfValuation, EpsWeighting, NearestDateConfig,
    ReportFormatter, ScoreCard, ScoreFactor, ScoringEngine, ScoringThresholds, TextReportFormatter,
    Valuation, ValuationEngine, ValuationPolicy, Verdict,
};

// Providers
#[cfg(feature = "finnhub")]
pub use intrinsic_finnhub::FinnhubProvider;
#[cfg(feature = "yahoo")]
pub use intrinsic_yahoo::YahooProvider;

mod options;
pub use options::AnalysisOptions;

mod registry;
pub use registry::{ProviderRegistry, peer_order};
