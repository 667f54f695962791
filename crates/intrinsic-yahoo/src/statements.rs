//! Normalization of Yahoo statement payloads into [`StatementTable`]s.

use chrono::{TimeZone, Utc};
use intrinsic_core::{FiscalPeriod, Metric, PeriodType, StatementTable};
use serde_json::Value;
use tracing::debug;

/// One of the three quote summary statement modules.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StatementKind {
    BalanceSheet,
    IncomeStatement,
    CashFlow,
}

impl StatementKind {
    /// Merge order of the sub-statements.
    pub(crate) const ALL: [Self; 3] = [Self::BalanceSheet, Self::IncomeStatement, Self::CashFlow];

    /// Quote summary module name.
    pub(crate) const fn module(self, period_type: PeriodType) -> &'static str {
        match (self, period_type) {
            (Self::BalanceSheet, PeriodType::Annual) => "balanceSheetHistory",
            (Self::BalanceSheet, PeriodType::Quarterly) => "balanceSheetHistoryQuarterly",
            (Self::IncomeStatement, PeriodType::Annual) => "incomeStatementHistory",
            (Self::IncomeStatement, PeriodType::Quarterly) => "incomeStatementHistoryQuarterly",
            (Self::CashFlow, PeriodType::Annual) => "cashflowStatementHistory",
            (Self::CashFlow, PeriodType::Quarterly) => "cashflowStatementHistoryQuarterly",
        }
    }

    /// Key of the statement list inside the module.
    const fn list_key(self) -> &'static str {
        match self {
            Self::BalanceSheet => "balanceSheetStatements",
            Self::IncomeStatement => "incomeStatementHistory",
            Self::CashFlow => "cashflowStatements",
        }
    }
}

/// Comma-separated statement modules for a quote summary request.
pub(crate) fn statement_modules(period_type: PeriodType) -> String {
    StatementKind::ALL
        .iter()
        .map(|k| k.module(period_type))
        .collect::<Vec<_>>()
        .join(",")
}

/// Maps a Yahoo line item to a canonical metric.
fn canonical_metric(key: &str) -> Metric {
    match key {
        "totalRevenue" => Metric::TotalRevenue,
        "netIncome" => Metric::NetIncome,
        "operatingIncome" => Metric::OperatingIncome,
        "ebit" => Metric::Ebit,
        "totalStockholderEquity" => Metric::StockholdersEquity,
        "totalAssets" => Metric::TotalAssets,
        "totalCashFromOperatingActivities" => Metric::CashFromOperatingActivities,
        "capitalExpenditures" => Metric::CapitalExpenditures,
        other => Metric::from_name(other),
    }
}

/// Parses one statement module into a table.
///
/// Line items Yahoo reports as `{}` are left out of the table.
pub(crate) fn parse_statement(module: &Value, kind: StatementKind) -> StatementTable {
    let mut table = StatementTable::new();
    let Some(statements) = module.get(kind.list_key()).and_then(Value::as_array) else {
        return table;
    };

    for statement in statements {
        let Some(entries) = statement.as_object() else {
            continue;
        };
        let Some(period) = statement.get("endDate").and_then(parse_end_date) else {
            debug!(?kind, "Skipping statement without end date");
            continue;
        };
        for (key, value) in entries {
            if key == "endDate" || key == "maxAge" {
                continue;
            }
            if let Some(raw) = value.get("raw").and_then(Value::as_f64) {
                table.insert(canonical_metric(key), period, raw);
            }
        }
    }
    table
}

fn parse_end_date(value: &Value) -> Option<FiscalPeriod> {
    if let Some(fmt) = value.get("fmt").and_then(Value::as_str) {
        if let Ok(period) = FiscalPeriod::parse(fmt) {
            return Some(period);
        }
    }
    let ts = value.get("raw").and_then(Value::as_i64)?;
    Utc.timestamp_opt(ts, 0)
        .single()
        .map(|dt| FiscalPeriod::new(dt.date_naive()))
}

/// Fundamentals time series fields fetched as statement extensions.
const TIMESERIES_FIELDS: [(&str, Metric); 4] = [
    ("DilutedEPS", Metric::DilutedEps),
    ("BasicEPS", Metric::BasicEps),
    ("DilutedAverageShares", Metric::DilutedAverageShares),
    ("FreeCashFlow", Metric::FreeCashFlow),
];

fn timeseries_prefix(period_type: PeriodType) -> &'static str {
    match period_type {
        PeriodType::Annual => "annual",
        PeriodType::Quarterly => "quarterly",
    }
}

/// Comma-separated `type` parameter of a fundamentals time series request.
pub(crate) fn timeseries_types(period_type: PeriodType) -> String {
    let prefix = timeseries_prefix(period_type);
    TIMESERIES_FIELDS
        .iter()
        .map(|(field, _)| format!("{prefix}{field}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Parses a fundamentals time series response into a table.
pub(crate) fn parse_timeseries(response: &Value, period_type: PeriodType) -> StatementTable {
    let prefix = timeseries_prefix(period_type);
    let mut table = StatementTable::new();
    let results = response
        .pointer("/timeseries/result")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for result in results {
        let Some(series_type) = result.pointer("/meta/type/0").and_then(Value::as_str) else {
            continue;
        };
        let Some(metric) = series_type
            .strip_prefix(prefix)
            .and_then(|field| TIMESERIES_FIELDS.iter().find(|(f, _)| *f == field))
            .map(|(_, m)| m.clone())
        else {
            continue;
        };
        let Some(points) = result.get(series_type).and_then(Value::as_array) else {
            continue;
        };

        for point in points {
            let period = point
                .get("asOfDate")
                .and_then(Value::as_str)
                .and_then(|s| FiscalPeriod::parse(s).ok());
            let value = point.pointer("/reportedValue/raw").and_then(Value::as_f64);
            if let (Some(period), Some(value)) = (period, value) {
                table.insert(metric.clone(), period, value);
            }
        }
    }
    table
}
