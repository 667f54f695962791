//! Single-metric time series.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::period::FiscalPeriod;

/// Values of one metric keyed by fiscal period, in chronological order.
///
/// A value may be NaN, meaning the provider reported the cell as missing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricSeries {
    values: BTreeMap<FiscalPeriod, f64>,
}

impl MetricSeries {
    /// Creates an empty series.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    /// Inserts a value, returning the value it overwrote.
    pub fn insert(&mut self, period: FiscalPeriod, value: f64) -> Option<f64> {
        self.values.insert(period, value)
    }

    /// Returns the value for a period.
    #[must_use]
    pub fn get(&self, period: &FiscalPeriod) -> Option<f64> {
        self.values.get(period).copied()
    }

    /// Returns the number of periods, NaN cells included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the series has no periods.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates `(period, value)` pairs, oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&FiscalPeriod, &f64)> {
        self.values.iter()
    }

    /// Returns the periods, oldest first.
    pub fn periods(&self) -> impl Iterator<Item = &FiscalPeriod> {
        self.values.keys()
    }

    /// Returns all values, oldest first, NaN cells included.
    #[must_use]
    pub fn values(&self) -> Vec<f64> {
        self.values.values().copied().collect()
    }

    /// Returns the finite values, oldest first.
    #[must_use]
    pub fn finite_values(&self) -> Vec<f64> {
        self.values.values().copied().filter(|v| v.is_finite()).collect()
    }

    /// Mean of the finite values; `None` if there are none.
    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        mean(&self.finite_values())
    }

    /// Returns a copy where every NaN cell is replaced by the mean of the
    /// finite values. An all-NaN series is returned unchanged.
    #[must_use]
    pub fn fill_missing_with_mean(&self) -> Self {
        let Some(fill) = self.mean() else {
            return self.clone();
        };
        Self {
            values: self
                .values
                .iter()
                .map(|(p, v)| (*p, if v.is_finite() { *v } else { fill }))
                .collect(),
        }
    }

    /// Returns the most recent period and its value.
    #[must_use]
    pub fn latest(&self) -> Option<(FiscalPeriod, f64)> {
        self.values.iter().next_back().map(|(p, v)| (*p, *v))
    }

    /// Returns the `n` most recent `(period, value)` pairs, oldest first.
    #[must_use]
    pub fn last_n(&self, n: usize) -> Vec<(FiscalPeriod, f64)> {
        let skip = self.values.len().saturating_sub(n);
        self.values.iter().skip(skip).map(|(p, v)| (*p, *v)).collect()
    }
}

impl FromIterator<(FiscalPeriod, f64)> for MetricSeries {
    fn from_iter<I: IntoIterator<Item = (FiscalPeriod, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Arithmetic mean; `None` for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn period(year: i32) -> FiscalPeriod {
        FiscalPeriod::from_ymd(year, 12, 31).unwrap()
    }

    #[test]
    fn test_values_are_chronological() {
        let series: MetricSeries = [(period(2021), 3.0), (period(2019), 1.0), (period(2020), 2.0)]
            .into_iter()
            .collect();
        assert_eq!(series.values(), vec![1.0, 2.0, 3.0]);
        assert_eq!(series.latest(), Some((period(2021), 3.0)));
    }

    #[test]
    fn test_mean_skips_nan() {
        let series: MetricSeries = [(period(2019), 1.0), (period(2020), f64::NAN), (period(2021), 3.0)]
            .into_iter()
            .collect();
        assert_relative_eq!(series.mean().unwrap(), 2.0);
        assert_eq!(series.finite_values(), vec![1.0, 3.0]);
    }

    #[test]
    fn test_fill_missing_with_mean() {
        let series: MetricSeries = [(period(2019), 1.0), (period(2020), f64::NAN), (period(2021), 5.0)]
            .into_iter()
            .collect();
        let filled = series.fill_missing_with_mean();
        assert_eq!(filled.values(), vec![1.0, 3.0, 5.0]);

        let all_nan: MetricSeries = [(period(2019), f64::NAN)].into_iter().collect();
        assert!(all_nan.fill_missing_with_mean().values()[0].is_nan());
        assert!(all_nan.mean().is_none());
    }

    #[test]
    fn test_last_n() {
        let series: MetricSeries = (2015..=2021).map(|y| (period(y), f64::from(y))).collect();
        let last = series.last_n(3);
        assert_eq!(last.len(), 3);
        assert_eq!(last[0], (period(2019), 2019.0));
        assert_eq!(last[2], (period(2021), 2021.0));
        assert_eq!(series.last_n(20).len(), 7);
    }
}
