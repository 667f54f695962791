//! Nearest trading date lookup.
//!
//! Fiscal and report calendars do not line up with trading calendars, so a
//! calendar date is resolved to a trading date by probing outward from the
//! target one day at a time, forward before backward, up to a fixed radius.

use chrono::{Days, NaiveDate};
use intrinsic_core::{AnalysisError, AnalysisResult, PriceHistory};

use crate::policy::NearestDateConfig;

/// Resolves `target` against a sorted slice of trading dates.
///
/// Returns the exact date if present, else the first of `target + r`,
/// `target - r` found for `r = 1, 2, ...` up to the configured radius.
pub fn resolve(
    dates: &[NaiveDate],
    target: NaiveDate,
    config: &NearestDateConfig,
) -> AnalysisResult<NaiveDate> {
    let present = |d: NaiveDate| dates.binary_search(&d).is_ok();

    if present(target) {
        return Ok(target);
    }
    for radius in 1..=u64::from(config.max_radius_days) {
        let forward = target.checked_add_days(Days::new(radius));
        if let Some(d) = forward.filter(|d| present(*d)) {
            return Ok(d);
        }
        let backward = target.checked_sub_days(Days::new(radius));
        if let Some(d) = backward.filter(|d| present(*d)) {
            return Ok(d);
        }
    }

    Err(AnalysisError::DateLookupFailure {
        target,
        max_radius_days: config.max_radius_days,
    })
}

/// Resolves `target` against the bars of a price history.
pub fn resolve_in(
    history: &PriceHistory,
    target: NaiveDate,
    config: &NearestDateConfig,
) -> AnalysisResult<NaiveDate> {
    resolve(&history.dates(), target, config)
}

/// Close on the trading date nearest to `target`.
pub fn close_near(
    history: &PriceHistory,
    target: NaiveDate,
    config: &NearestDateConfig,
) -> AnalysisResult<f64> {
    let date = resolve_in(history, target, config)?;
    history
        .close_on(date)
        .ok_or(AnalysisError::DateLookupFailure {
            target,
            max_radius_days: config.max_radius_days,
        })
}
