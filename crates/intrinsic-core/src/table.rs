//! The metric × fiscal period statement table.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::{
    error::{AnalysisError, AnalysisResult, DataError, Result},
    metric::Metric,
    period::FiscalPeriod,
    series::MetricSeries,
};

/// A sparse two-dimensional table of reported values.
///
/// Rows are [`Metric`]s, columns are [`FiscalPeriod`]s. A metric appears at
/// most once; writing an existing `(metric, period)` cell overwrites it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatementTable {
    rows: BTreeMap<Metric, MetricSeries>,
}

impl StatementTable {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }

    /// Writes a cell, returning the value it overwrote.
    pub fn insert(&mut self, metric: Metric, period: FiscalPeriod, value: f64) -> Option<f64> {
        self.rows.entry(metric).or_default().insert(period, value)
    }

    /// Returns a cell value.
    #[must_use]
    pub fn get(&self, metric: &Metric, period: &FiscalPeriod) -> Option<f64> {
        self.rows.get(metric).and_then(|s| s.get(period))
    }

    /// Returns the series of a metric, if it has at least one cell.
    #[must_use]
    pub fn series(&self, metric: &Metric) -> Option<&MetricSeries> {
        self.rows.get(metric).filter(|s| !s.is_empty())
    }

    /// Returns the series of a metric or [`AnalysisError::MissingMetric`].
    pub fn require(&self, metric: &Metric, scope: &str) -> AnalysisResult<&MetricSeries> {
        self.series(metric).ok_or_else(|| AnalysisError::MissingMetric {
            metric: metric.clone(),
            scope: scope.to_string(),
        })
    }

    /// Returns true if the table has a non-empty series for the metric.
    #[must_use]
    pub fn contains(&self, metric: &Metric) -> bool {
        self.series(metric).is_some()
    }

    /// Iterates the rows in metric order.
    pub fn iter(&self) -> impl Iterator<Item = (&Metric, &MetricSeries)> {
        self.rows.iter()
    }

    /// Returns the union of all periods, oldest first.
    #[must_use]
    pub fn periods(&self) -> BTreeSet<FiscalPeriod> {
        self.rows
            .values()
            .flat_map(|s| s.periods().copied())
            .collect()
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns the number of cells across all rows.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.rows.values().map(MetricSeries::len).sum()
    }

    /// Returns true if the table has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cell_count() == 0
    }

    /// Converts the table to a DataFrame.
    ///
    /// The frame has a `metric` column followed by one Float64 column per
    /// period named `YYYY-MM-DD`, oldest first. Absent cells are null.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let periods = self.periods();
        let mut columns = Vec::with_capacity(periods.len() + 1);

        let names: Vec<&str> = self.rows.keys().map(Metric::name).collect();
        columns.push(Column::new("metric".into(), names));

        for period in &periods {
            let values: Vec<Option<f64>> = self.rows.values().map(|s| s.get(period)).collect();
            columns.push(Column::new(period.to_string().into(), values));
        }

        DataFrame::new(columns).map_err(|e| DataError::Other(e.to_string()))
    }
}

impl FromIterator<(Metric, FiscalPeriod, f64)> for StatementTable {
    fn from_iter<I: IntoIterator<Item = (Metric, FiscalPeriod, f64)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (metric, period, value) in iter {
            table.insert(metric, period, value);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period(year: i32) -> FiscalPeriod {
        FiscalPeriod::from_ymd(year, 12, 31).unwrap()
    }

    #[test]
    fn test_insert_overwrites_silently() {
        let mut table = StatementTable::new();
        assert_eq!(table.insert(Metric::NetIncome, period(2020), 1.0), None);
        assert_eq!(table.insert(Metric::NetIncome, period(2020), 2.0), Some(1.0));
        assert_eq!(table.get(&Metric::NetIncome, &period(2020)), Some(2.0));
        assert_eq!(table.len(), 1);
        assert_eq!(table.cell_count(), 1);
    }

    #[test]
    fn test_require_reports_missing_metric() {
        let table: StatementTable = [(Metric::TotalAssets, period(2020), 10.0)]
            .into_iter()
            .collect();
        assert!(table.require(&Metric::TotalAssets, "equity ratio").is_ok());

        let err = table.require(&Metric::Ebit, "EBIT margin").unwrap_err();
        assert_eq!(
            err,
            AnalysisError::MissingMetric {
                metric: Metric::Ebit,
                scope: "EBIT margin".to_string(),
            }
        );
    }

    #[test]
    fn test_periods_are_union() {
        let table: StatementTable = [
            (Metric::NetIncome, period(2019), 1.0),
            (Metric::TotalRevenue, period(2020), 2.0),
            (Metric::NetIncome, period(2021), 3.0),
        ]
        .into_iter()
        .collect();
        let periods: Vec<_> = table.periods().into_iter().collect();
        assert_eq!(periods, vec![period(2019), period(2020), period(2021)]);
    }

    #[test]
    fn test_to_frame_layout() {
        let table: StatementTable = [
            (Metric::NetIncome, period(2020), 1.0),
            (Metric::TotalRevenue, period(2020), 10.0),
            (Metric::TotalRevenue, period(2021), 12.0),
        ]
        .into_iter()
        .collect();

        let df = table.to_frame().unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 3);

        let col_2021 = df.column("2021-12-31").unwrap().as_materialized_series().f64().unwrap();
        // rows are in metric order: TotalRevenue, NetIncome
        assert_eq!(col_2021.get(0), Some(12.0));
        assert_eq!(col_2021.get(1), None);
    }
}
