//! Per-instrument analysis report and its text rendering.

use chrono::NaiveDate;
use intrinsic_core::{AnalysisResult, FinancialFactTable, InstrumentConfig, PriceHistory};
use std::fmt::{self, Write};
use tracing::debug;

use crate::{
    policy::{CapBucket, NearestDateConfig, ScoringThresholds, ValuationPolicy},
    profitability::{ProfitabilityRatio, RatioKind, ratios},
    scoring::{ScoreCard, ScoringEngine},
    valuation::{Valuation, ValuationEngine},
};

/// Everything computed for one instrument.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisReport {
    /// Ticker.
    pub symbol: String,
    /// Display name.
    pub name: String,
    /// Trading currency.
    pub currency: Option<String>,
    /// Date the analysis refers to.
    pub as_of: NaiveDate,
    /// Current price.
    pub price: Option<f64>,
    /// Valuation figures.
    pub valuation: Valuation,
    /// Profitability ratios in report order.
    pub ratios: Vec<(RatioKind, AnalysisResult<ProfitabilityRatio>)>,
    /// Multi-factor score.
    pub score: AnalysisResult<ScoreCard>,
}

/// Runs the valuation and scoring engines over a fact table.
#[derive(Clone, Debug, Default)]
pub struct Analyzer {
    valuation: ValuationEngine,
    scoring: ScoringEngine,
}

impl Analyzer {
    /// Creates an analyzer from explicit configuration.
    #[must_use]
    pub const fn new(
        policy: ValuationPolicy,
        thresholds: ScoringThresholds,
        nearest: NearestDateConfig,
    ) -> Self {
        Self {
            valuation: ValuationEngine::new(policy),
            scoring: ScoringEngine::new(thresholds, nearest),
        }
    }

    /// The valuation engine.
    #[must_use]
    pub const fn valuation(&self) -> &ValuationEngine {
        &self.valuation
    }

    /// The scoring engine.
    #[must_use]
    pub const fn scoring(&self) -> &ScoringEngine {
        &self.scoring
    }

    /// Analyzes one instrument. Each section fails independently.
    #[must_use]
    pub fn analyze(
        &self,
        facts: &FinancialFactTable,
        config: &InstrumentConfig,
        index: &PriceHistory,
        as_of: NaiveDate,
    ) -> AnalysisReport {
        debug!(symbol = %facts.symbol(), %as_of, "Analyzing");
        AnalysisReport {
            symbol: facts.symbol().to_string(),
            name: facts.name().to_string(),
            currency: facts.currency().map(str::to_string),
            as_of,
            price: facts.basic().price,
            valuation: self.valuation.compute(facts, &config.assumptions),
            ratios: ratios(facts),
            score: self.scoring.score(facts, index, &config.dates, as_of),
        }
    }
}

/// Renders an [`AnalysisReport`].
pub trait ReportFormatter {
    /// Writes the report.
    fn write(&self, report: &AnalysisReport, out: &mut dyn Write) -> fmt::Result;

    /// Renders the report to a string.
    fn render(&self, report: &AnalysisReport) -> String {
        let mut out = String::new();
        self.write(report, &mut out).ok();
        out
    }
}

/// Fixed-width plain text report.
#[derive(Clone, Copy, Debug)]
pub struct TextReportFormatter {
    /// Width of the label column.
    pub label_width: usize,
}

impl Default for TextReportFormatter {
    fn default() -> Self {
        Self { label_width: 28 }
    }
}

const MISSING: &str = "MISSING";

fn or_missing<T>(value: &AnalysisResult<T>, show: impl Fn(&T) -> String) -> String {
    match value {
        Ok(v) => show(v),
        Err(e) => format!("{MISSING} ({e})"),
    }
}

fn opt_or_missing(value: Option<f64>, show: impl Fn(f64) -> String) -> String {
    value
        .filter(|v| v.is_finite())
        .map_or_else(|| MISSING.to_string(), show)
}

impl TextReportFormatter {
    fn line(&self, out: &mut dyn Write, label: &str, value: &str) -> fmt::Result {
        writeln!(out, "  {label:<width$} {value}", width = self.label_width)
    }

    fn write_dcf(&self, report: &AnalysisReport, out: &mut dyn Write) -> fmt::Result {
        writeln!(out, "Discounted cash flow")?;
        let dcf = match &report.valuation.dcf {
            Ok(dcf) => dcf,
            Err(e) => {
                return self.line(
                    out,
                    "Fair value",
                    &format!("cannot be calculated due to missing data ({e})"),
                );
            }
        };
        let a = dcf.assumptions;
        self.line(
            out,
            "Assumptions",
            &format!(
                "r {:.1}%, g1-5 {:.1}%, g6-10 {:.1}%, g10ff {:.1}%, MoS {:.1}%",
                a.discount_rate * 100.0,
                a.growth_1_to_5 * 100.0,
                a.growth_6_to_10 * 100.0,
                a.perpetual_growth * 100.0,
                a.margin_of_safety * 100.0
            ),
        )?;
        self.line(out, "Start value", &format!("{:.0}", dcf.start_value))?;
        writeln!(out, "  {:>4} {:>18} {:>10} {:>18}", "Year", "Cash flow", "Discount", "Present value")?;
        for y in &dcf.years {
            writeln!(
                out,
                "  {:>4} {:>18.0} {:>10.4} {:>18.0}",
                y.year, y.cash_flow, y.discount_factor, y.present_value
            )?;
        }
        self.line(out, "Terminal value", &format!("{:.0}", dcf.terminal_value))?;
        self.line(out, "Terminal present value", &format!("{:.0}", dcf.terminal_present_value))?;
        self.line(out, "Total present value", &format!("{:.0}", dcf.total_present_value))?;
        self.line(out, "Value per share", &format!("{:.2}", dcf.value_per_share))?;
        self.line(out, "Fair value per share", &format!("{:.2}", dcf.fair_value))
    }

    fn write_score(&self, report: &AnalysisReport, out: &mut dyn Write) -> fmt::Result {
        writeln!(out, "Levermann score")?;
        let card = match &report.score {
            Ok(card) => card,
            Err(e) => return self.line(out, "Score", &format!("{MISSING} ({e})")),
        };
        for f in &card.factors {
            let input = f.input.map_or_else(String::new, |v| format!("{v:.2}"));
            let note = f.note.as_deref().unwrap_or_default();
            writeln!(
                out,
                "  {:<width$} {:>10} {:>+3}  {}",
                f.factor.label(),
                input,
                f.points,
                note,
                width = self.label_width
            )?;
        }
        let verdict = match (card.verdict, card.bucket) {
            (Some(v), Some(bucket)) => {
                let size = match bucket {
                    CapBucket::Large => "large cap",
                    CapBucket::Mid => "mid cap",
                    CapBucket::Small => "small cap",
                };
                format!("{v} ({size})")
            }
            _ => format!("{MISSING} (market cap unknown)"),
        };
        self.line(out, "Total", &format!("{:+}", card.total))?;
        self.line(out, "Verdict", &verdict)
    }
}

impl ReportFormatter for TextReportFormatter {
    fn write(&self, report: &AnalysisReport, out: &mut dyn Write) -> fmt::Result {
        let v = &report.valuation;
        writeln!(out, "==== {} ({}) ====", report.name, report.symbol)?;
        writeln!(
            out,
            "As of {}, currency {}",
            report.as_of,
            report.currency.as_deref().unwrap_or(MISSING)
        )?;
        writeln!(out)?;

        writeln!(out, "Basic data")?;
        self.line(out, "Price", &opt_or_missing(report.price, |p| format!("{p:.2}")))?;
        self.line(out, "EPS", &or_missing(&v.eps, |e| format!("{e:.2}")))?;
        self.line(out, "P/E", &opt_or_missing(v.pe, |p| format!("{p:.2}")))?;
        self.line(
            out,
            "Dividend yield",
            &or_missing(&v.dividend_yield, |y| format!("{:.2}%", y * 100.0)),
        )?;
        self.line(out, "Graham Number", &or_missing(&v.graham_number, |g| format!("{g:.2}")))?;
        self.line(
            out,
            "Earnings fair value",
            &or_missing(&v.earnings_fair_value, |e| format!("{e:.2}")),
        )?;
        writeln!(out)?;

        self.write_dcf(report, out)?;
        writeln!(out)?;

        writeln!(out, "Profitability")?;
        for (kind, ratio) in &report.ratios {
            let value = or_missing(ratio, |r| {
                format!("{:>7.2}%  {} ({})", r.percent, r.comment(), r.period)
            });
            self.line(out, kind.label(), &value)?;
        }
        writeln!(out)?;

        self.write_score(report, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intrinsic_core::{
        Assumptions, BasicData, FiscalPeriod, KeyStatistics, Metric, ReportDates, StatementTable,
        Symbol,
    };

    fn fy(year: i32) -> FiscalPeriod {
        FiscalPeriod::from_ymd(year, 12, 31).unwrap()
    }

    fn facts() -> FinancialFactTable {
        let table: StatementTable = [
            (Metric::FreeCashFlow, fy(2019), 1.0e9),
            (Metric::FreeCashFlow, fy(2020), 1.1e9),
            (Metric::FreeCashFlow, fy(2021), 1.21e9),
            (Metric::NetIncome, fy(2021), 2.0e9),
            (Metric::TotalRevenue, fy(2021), 1.0e10),
        ]
        .into_iter()
        .collect();
        FinancialFactTable::new(Symbol::new("TEST"))
            .with_statements(&table)
            .with_basic(&BasicData {
                price: Some(20.0),
                trailing_eps: Some(1.5),
                book_value_per_share: Some(10.0),
                dividend_rate: Some(0.4),
                ..Default::default()
            })
            .with_key_stats(&KeyStatistics {
                shares_outstanding: Some(1.0e9),
                market_cap: Some(2.0e10),
            })
    }

    fn config() -> InstrumentConfig {
        InstrumentConfig {
            assumptions: Assumptions::from_percent(10.0, 20.0, 8.0, 5.0, 2.0),
            dates: ReportDates::default(),
        }
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
    }

    #[test]
    fn test_analyze_isolates_sections() {
        let report = Analyzer::default().analyze(&facts(), &config(), &PriceHistory::default(), as_of());
        assert!(report.valuation.dcf.is_ok());
        assert!(report.valuation.graham_number.is_ok());
        // no EBIT or equity: the score fails as a whole, nothing else does
        assert!(report.score.is_err());
        assert!(report.ratios[0].1.is_ok());
        assert_eq!(report.name, "TEST");
    }

    #[test]
    fn test_text_report_marks_missing() {
        let report = Analyzer::default().analyze(&facts(), &config(), &PriceHistory::default(), as_of());
        let text = TextReportFormatter::default().render(&report);

        assert!(text.contains("==== TEST (TEST) ===="));
        assert!(text.contains("Fair value per share"));
        assert!(text.contains("18.07"));
        assert!(text.contains("2.00%"));
        assert!(text.contains("Return on equity"));
        assert!(text.contains(MISSING));
        assert!(text.contains("Levermann score"));
    }

    #[test]
    fn test_text_report_without_assumptions() {
        let config = InstrumentConfig::default();
        let report = Analyzer::default().analyze(&facts(), &config, &PriceHistory::default(), as_of());
        let text = TextReportFormatter::default().render(&report);
        assert!(text.contains("cannot be calculated due to missing data"));
        assert!(text.contains("discountRate"));
    }
}
