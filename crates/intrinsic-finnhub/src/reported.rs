//! Normalization of Finnhub "financials as reported" filings.
//!
//! Filings carry XBRL concepts such as `us-gaap_NetIncomeLoss`. The taxonomy
//! prefix is stripped, known concepts are translated to canonical metrics and
//! everything else is kept under its concept name.

use std::collections::HashMap;

use intrinsic_core::{FiscalPeriod, Metric, StatementTable};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

/// Operating cash flow concepts, in priority order.
const OPERATING_CASH_FLOW: [&str; 2] = [
    "NetCashProvidedByUsedInOperatingActivities",
    "NetCashProvidedByUsedInOperatingActivitiesContinuingOperations",
];
const REVENUE: [&str; 2] = ["Revenues", "RevenueFromContractWithCustomerExcludingAssessedTax"];
const PPE_PURCHASES: &str = "PaymentsToAcquirePropertyPlantAndEquipment";
const INTANGIBLE_PURCHASES: &str = "PaymentsToAcquireIntangibleAssets";

/// Concepts with a canonical mapping; these are not repeated as reported metrics.
const MAPPED: [&str; 13] = [
    "NetIncomeLoss",
    "Revenues",
    "RevenueFromContractWithCustomerExcludingAssessedTax",
    "StockholdersEquity",
    "Assets",
    "NetCashProvidedByUsedInOperatingActivities",
    "NetCashProvidedByUsedInOperatingActivitiesContinuingOperations",
    "WeightedAverageNumberOfDilutedSharesOutstanding",
    "OperatingIncomeLoss",
    "EarningsPerShareDiluted",
    "EarningsPerShareBasic",
    PPE_PURCHASES,
    INTANGIBLE_PURCHASES,
];

/// `stock/financials-reported` response.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct FinancialsReported {
    #[serde(default)]
    pub(crate) data: Vec<ReportedFiling>,
}

/// One filing (10-K or 10-Q).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReportedFiling {
    end_date: String,
    #[serde(default)]
    report: Report,
}

#[derive(Debug, Default, Deserialize)]
struct Report {
    #[serde(default, deserialize_with = "lenient_items")]
    bs: Vec<ReportItem>,
    #[serde(default, deserialize_with = "lenient_items")]
    ic: Vec<ReportItem>,
    #[serde(default, deserialize_with = "lenient_items")]
    cf: Vec<ReportItem>,
}

#[derive(Debug, Deserialize)]
struct ReportItem {
    concept: String,
    #[serde(default)]
    value: Value,
}

/// Older filings sometimes send a section as an object; those read as empty.
fn lenient_items<'de, D>(deserializer: D) -> std::result::Result<Vec<ReportItem>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// Strips the taxonomy prefix of a concept (`us-gaap_Assets` becomes `Assets`).
pub(crate) fn strip_prefix(concept: &str) -> &str {
    concept.split_once('_').map_or(concept, |(_, name)| name)
}

/// Concept values of one statement section. The first occurrence of a
/// concept wins.
struct Section(HashMap<String, f64>);

impl Section {
    fn new(items: &[ReportItem]) -> Self {
        let mut values = HashMap::new();
        for item in items {
            if let Some(value) = item.value.as_f64() {
                values.entry(strip_prefix(&item.concept).to_string()).or_insert(value);
            }
        }
        Self(values)
    }

    fn get(&self, concept: &str) -> Option<f64> {
        self.0.get(concept).copied()
    }

    fn first_of(&self, concepts: &[&str]) -> Option<f64> {
        concepts.iter().find_map(|c| self.get(c))
    }
}

/// Normalizes filings into one table. Later filings for the same period end
/// overwrite earlier ones.
pub(crate) fn normalize_filings(filings: &[ReportedFiling]) -> StatementTable {
    let mut table = StatementTable::new();
    for filing in filings {
        let period = match FiscalPeriod::parse(&filing.end_date) {
            Ok(period) => period,
            Err(e) => {
                debug!(error = %e, "Skipping filing with unparseable end date");
                continue;
            }
        };
        normalize_filing(&filing.report, period, &mut table);
    }
    table
}

fn normalize_filing(report: &Report, period: FiscalPeriod, table: &mut StatementTable) {
    let bs = Section::new(&report.bs);
    let ic = Section::new(&report.ic);
    let cf = Section::new(&report.cf);

    let mut put = |metric: Metric, value: Option<f64>| {
        if let Some(v) = value {
            table.insert(metric, period, v);
        }
    };

    put(Metric::NetIncome, ic.get("NetIncomeLoss"));
    put(Metric::TotalRevenue, ic.first_of(&REVENUE));
    put(Metric::OperatingIncome, ic.get("OperatingIncomeLoss"));
    put(Metric::Ebit, ic.get("OperatingIncomeLoss"));
    put(
        Metric::DilutedAverageShares,
        ic.get("WeightedAverageNumberOfDilutedSharesOutstanding"),
    );
    put(Metric::DilutedEps, ic.get("EarningsPerShareDiluted"));
    put(Metric::BasicEps, ic.get("EarningsPerShareBasic"));
    put(Metric::StockholdersEquity, bs.get("StockholdersEquity"));
    put(Metric::TotalAssets, bs.get("Assets"));

    let operating = cf.first_of(&OPERATING_CASH_FLOW);
    let capex = capital_expenditures(&cf);
    put(Metric::CashFromOperatingActivities, operating);
    put(Metric::CapitalExpenditures, capex);
    put(Metric::FreeCashFlow, free_cash_flow(operating, capex));

    for section in [&report.bs, &report.ic, &report.cf] {
        for item in section {
            let concept = strip_prefix(&item.concept);
            if MAPPED.contains(&concept) {
                continue;
            }
            put(Metric::Reported(concept.to_string()), item.value.as_f64());
        }
    }
}

/// PP&E purchases plus, when reported and not NaN, intangible purchases.
/// Without PP&E purchases there is no capital expenditure figure.
fn capital_expenditures(cf: &Section) -> Option<f64> {
    let ppe = cf.get(PPE_PURCHASES)?;
    match cf.get(INTANGIBLE_PURCHASES) {
        Some(intangibles) if !intangibles.is_nan() => Some(ppe + intangibles),
        _ => Some(ppe),
    }
}

/// Operating cash flow minus capital expenditures. Issuers without a capex
/// line (typically banks) report free cash flow equal to operating cash flow.
fn free_cash_flow(operating: Option<f64>, capex: Option<f64>) -> Option<f64> {
    let operating = operating?;
    Some(match capex {
        Some(capex) => operating - capex,
        None => operating,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period(s: &str) -> FiscalPeriod {
        FiscalPeriod::parse(s).unwrap()
    }

    fn parse(json: &str) -> StatementTable {
        let response: FinancialsReported = serde_json::from_str(json).unwrap();
        normalize_filings(&response.data)
    }

    const FILING: &str = r#"{
        "cik": "320193",
        "data": [{
            "symbol": "AAPL",
            "year": 2023,
            "quarter": 0,
            "form": "10-K",
            "startDate": "2022-09-25 00:00:00",
            "endDate": "2023-09-30 00:00:00",
            "report": {
                "bs": [
                    {"concept": "us-gaap_Assets", "unit": "usd", "value": 352583000000},
                    {"concept": "us-gaap_StockholdersEquity", "unit": "usd", "value": 62146000000},
                    {"concept": "us-gaap_LongTermDebtNoncurrent", "unit": "usd", "value": 95281000000}
                ],
                "ic": [
                    {"concept": "us-gaap_RevenueFromContractWithCustomerExcludingAssessedTax", "value": 383285000000},
                    {"concept": "us-gaap_OperatingIncomeLoss", "value": 114301000000},
                    {"concept": "us-gaap_NetIncomeLoss", "value": 96995000000},
                    {"concept": "us-gaap_EarningsPerShareDiluted", "value": 6.13},
                    {"concept": "us-gaap_WeightedAverageNumberOfDilutedSharesOutstanding", "value": 15812547000}
                ],
                "cf": [
                    {"concept": "us-gaap_NetCashProvidedByUsedInOperatingActivitiesContinuingOperations", "value": 100000000000},
                    {"concept": "us-gaap_NetCashProvidedByUsedInOperatingActivities", "value": 110543000000},
                    {"concept": "us-gaap_PaymentsToAcquirePropertyPlantAndEquipment", "value": 10959000000},
                    {"concept": "us-gaap_PaymentsToAcquireIntangibleAssets", "value": 41000000}
                ]
            }
        }]
    }"#;

    #[test]
    fn test_canonical_mapping() {
        let table = parse(FILING);
        let p = period("2023-09-30");
        assert_eq!(table.get(&Metric::TotalAssets, &p), Some(352583000000.0));
        assert_eq!(table.get(&Metric::StockholdersEquity, &p), Some(62146000000.0));
        assert_eq!(table.get(&Metric::TotalRevenue, &p), Some(383285000000.0));
        assert_eq!(table.get(&Metric::NetIncome, &p), Some(96995000000.0));
        assert_eq!(table.get(&Metric::Ebit, &p), Some(114301000000.0));
        assert_eq!(table.get(&Metric::OperatingIncome, &p), Some(114301000000.0));
        assert_eq!(table.get(&Metric::DilutedEps, &p), Some(6.13));
        assert_eq!(table.get(&Metric::DilutedAverageShares, &p), Some(15812547000.0));
    }

    #[test]
    fn test_operating_cash_flow_priority_and_free_cash_flow() {
        let table = parse(FILING);
        let p = period("2023-09-30");
        // the plain concept wins over the continuing-operations variant
        assert_eq!(
            table.get(&Metric::CashFromOperatingActivities, &p),
            Some(110543000000.0)
        );
        assert_eq!(table.get(&Metric::CapitalExpenditures, &p), Some(11000000000.0));
        assert_eq!(table.get(&Metric::FreeCashFlow, &p), Some(99543000000.0));
    }

    #[test]
    fn test_unmapped_concepts_are_reported() {
        let table = parse(FILING);
        assert!(table.contains(&Metric::Reported("LongTermDebtNoncurrent".to_string())));
        assert!(!table.contains(&Metric::Reported("Assets".to_string())));
    }

    #[test]
    fn test_free_cash_flow_without_capex_is_operating_cash_flow() {
        let table = parse(
            r#"{"data": [{"endDate": "2022-12-31 00:00:00", "report": {
                "bs": [], "ic": [],
                "cf": [{"concept": "us-gaap_NetCashProvidedByUsedInOperatingActivitiesContinuingOperations", "value": 5000}]
            }}]}"#,
        );
        let p = period("2022-12-31");
        assert_eq!(table.get(&Metric::CashFromOperatingActivities, &p), Some(5000.0));
        assert_eq!(table.get(&Metric::FreeCashFlow, &p), Some(5000.0));
        assert!(!table.contains(&Metric::CapitalExpenditures));
    }

    #[test]
    fn test_intangibles_only_count_with_ppe() {
        let cf = Section(HashMap::from([(INTANGIBLE_PURCHASES.to_string(), 10.0)]));
        assert_eq!(capital_expenditures(&cf), None);

        let cf = Section(HashMap::from([
            (PPE_PURCHASES.to_string(), 100.0),
            (INTANGIBLE_PURCHASES.to_string(), f64::NAN),
        ]));
        assert_eq!(capital_expenditures(&cf), Some(100.0));
    }

    #[test]
    fn test_absent_concepts_are_not_nan_cells() {
        let table = parse(
            r#"{"data": [{"endDate": "2022-12-31 00:00:00", "report": {"bs": {}, "ic": [], "cf": []}}]}"#,
        );
        assert!(table.is_empty());
        assert!(!table.contains(&Metric::NetIncome));
    }

    #[test]
    fn test_strip_prefix() {
        assert_eq!(strip_prefix("us-gaap_Assets"), "Assets");
        assert_eq!(strip_prefix("aapl_CustomThing"), "CustomThing");
        assert_eq!(strip_prefix("Assets"), "Assets");
    }
}
