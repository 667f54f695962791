//! OHLC price history of one instrument.

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    error::{DataError, Result},
    types::OhlcvBar,
};

/// Price bars sorted by date, at most one bar per date.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceHistory {
    bars: Vec<OhlcvBar>,
}

impl PriceHistory {
    /// Creates a history from bars in any order.
    ///
    /// Bars are sorted by date; when a date repeats, the last bar given wins.
    #[must_use]
    pub fn new(mut bars: Vec<OhlcvBar>) -> Self {
        bars.reverse();
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        Self { bars }
    }

    /// Builds a history from a price frame.
    ///
    /// Expects a Date (or Int32 days-since-epoch) `date` column and numeric
    /// `open`, `high`, `low`, `close` and `volume` columns. Rows without a
    /// close are dropped; a missing `volume` column reads as zero.
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let days = df
            .column("date")
            .and_then(|c| c.cast(&DataType::Int32))
            .map_err(|e| DataError::Parse(format!("price frame date column: {e}")))?;
        let days: Vec<Option<i32>> = days
            .as_materialized_series()
            .i32()
            .map_err(|e| DataError::Parse(e.to_string()))?
            .into_iter()
            .collect();

        let open = f64_column(df, "open")?;
        let high = f64_column(df, "high")?;
        let low = f64_column(df, "low")?;
        let close = f64_column(df, "close")?;
        let volume = if df.get_column_names().iter().any(|n| n.as_str() == "volume") {
            f64_column(df, "volume")?
        } else {
            vec![Some(0.0); df.height()]
        };

        let epoch = NaiveDate::default();
        let bars = (0..df.height())
            .filter_map(|i| {
                let date = epoch.checked_add_signed(chrono::Duration::days(i64::from(days[i]?)))?;
                let close = close[i]?;
                Some(OhlcvBar::new(
                    date,
                    open[i].unwrap_or(f64::NAN),
                    high[i].unwrap_or(f64::NAN),
                    low[i].unwrap_or(f64::NAN),
                    close,
                    volume[i].unwrap_or(0.0),
                ))
            })
            .collect();

        Ok(Self::new(bars))
    }

    /// Returns the bars, oldest first.
    #[must_use]
    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    /// Returns the trading dates, oldest first.
    #[must_use]
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    /// Returns the number of bars.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Returns true if there are no bars.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Returns the bar on an exact date.
    #[must_use]
    pub fn bar_on(&self, date: NaiveDate) -> Option<&OhlcvBar> {
        self.bars
            .binary_search_by_key(&date, |b| b.date)
            .ok()
            .map(|i| &self.bars[i])
    }

    /// Returns the first bar strictly after a date.
    #[must_use]
    pub fn next_bar_after(&self, date: NaiveDate) -> Option<&OhlcvBar> {
        let idx = self.bars.partition_point(|b| b.date <= date);
        self.bars.get(idx)
    }

    /// Returns the close on an exact date.
    #[must_use]
    pub fn close_on(&self, date: NaiveDate) -> Option<f64> {
        self.bar_on(date).map(|b| b.close)
    }

    /// Returns the most recent bar.
    #[must_use]
    pub fn last(&self) -> Option<&OhlcvBar> {
        self.bars.last()
    }
}

impl FromIterator<OhlcvBar> for PriceHistory {
    fn from_iter<I: IntoIterator<Item = OhlcvBar>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

fn f64_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .and_then(|c| c.cast(&DataType::Float64))
        .map_err(|e| DataError::Parse(format!("price frame {name} column: {e}")))?;
    let values = column
        .as_materialized_series()
        .f64()
        .map_err(|e| DataError::Parse(e.to_string()))?
        .into_iter()
        .collect();
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_new_sorts_and_dedups() {
        let history = PriceHistory::new(vec![
            OhlcvBar::flat(date(2024, 1, 3), 3.0),
            OhlcvBar::flat(date(2024, 1, 1), 1.0),
            OhlcvBar::flat(date(2024, 1, 3), 4.0),
        ]);
        assert_eq!(history.len(), 2);
        assert_eq!(history.dates(), vec![date(2024, 1, 1), date(2024, 1, 3)]);
        assert_eq!(history.close_on(date(2024, 1, 3)), Some(4.0));
    }

    #[test]
    fn test_next_bar_after_skips_gaps() {
        let history: PriceHistory = [
            OhlcvBar::flat(date(2024, 1, 5), 1.0),
            OhlcvBar::flat(date(2024, 1, 8), 2.0),
        ]
        .into_iter()
        .collect();
        assert_eq!(history.next_bar_after(date(2024, 1, 5)).map(|b| b.close), Some(2.0));
        assert_eq!(history.next_bar_after(date(2024, 1, 4)).map(|b| b.close), Some(1.0));
        assert!(history.next_bar_after(date(2024, 1, 8)).is_none());
        assert!(history.bar_on(date(2024, 1, 6)).is_none());
    }

    #[test]
    fn test_from_frame() {
        let epoch = NaiveDate::default();
        let days: Vec<i32> = [date(2024, 1, 2), date(2024, 1, 3), date(2024, 1, 4)]
            .iter()
            .map(|d| (*d - epoch).num_days() as i32)
            .collect();
        let date_col = Column::new("date".into(), days).cast(&DataType::Date).unwrap();
        let df = DataFrame::new(vec![
            date_col,
            Column::new("open".into(), vec![Some(10.0), Some(11.0), Some(12.0)]),
            Column::new("high".into(), vec![Some(10.5), Some(11.5), Some(12.5)]),
            Column::new("low".into(), vec![Some(9.5), Some(10.5), Some(11.5)]),
            Column::new("close".into(), vec![Some(10.2), None, Some(12.2)]),
            Column::new("volume".into(), vec![Some(100u64), Some(200), Some(300)]),
        ])
        .unwrap();

        let history = PriceHistory::from_frame(&df).unwrap();
        assert_eq!(history.len(), 2);
        let bar = history.bar_on(date(2024, 1, 4)).unwrap();
        assert_eq!(bar.open, 12.0);
        assert_eq!(bar.close, 12.2);
        assert_eq!(bar.volume, 300.0);
    }

    #[test]
    fn test_from_frame_requires_close() {
        let df = DataFrame::new(vec![Column::new("date".into(), vec![1i32, 2])]).unwrap();
        assert!(PriceHistory::from_frame(&df).is_err());
    }
}
