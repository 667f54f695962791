//! Levermann-style multi-factor score.
//!
//! Scoring runs in two phases. [`ScoringEngine::inputs`] derives the raw
//! factor inputs from the fact table and the price histories, and
//! [`score_from_inputs`] maps them through the thresholds. Each of the 13
//! factors contributes -1, 0 or +1; the total is bucketed by market cap into
//! a verdict.
//!
//! Missing profitability statements abort the whole score. Anything else
//! that is missing only zeroes the factor that needs it, with a note.

use chrono::{Months, NaiveDate};
use intrinsic_core::{
    AnalysisError, AnalysisResult, FinancialFactTable, Metric, MetricSeries, PriceHistory,
    ReportDates,
    analyst::{current_and_next, latest_trend},
    series::mean,
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};
use tracing::{debug, error, warn};

use crate::{
    nearest_date::{close_near, resolve_in},
    policy::{CapBucket, NearestDateConfig, ScoringThresholds},
};

/// One of the 13 score factors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ScoreFactor {
    /// Mean operating income over equity.
    ReturnOnEquity,
    /// Mean EBIT over revenue.
    EbitMargin,
    /// Mean equity over assets.
    EquityRatio,
    /// Price over the current-year EPS estimate.
    CurrentPe,
    /// Price over the five-year average EPS.
    FiveYearPe,
    /// Mean analyst rating.
    AnalystRecommendation,
    /// Reaction to the last quarterly report, relative to the index.
    QuarterlyReaction,
    /// Six-month price change.
    SixMonthMove,
    /// Twelve-month price change.
    TwelveMonthMove,
    /// Composite of the six- and twelve-month moves.
    Momentum,
    /// Three-month reversal against the index.
    Reversal,
    /// Growth of next-year over current-year EPS estimate.
    ProfitGrowth,
    /// Reserved; always 0.
    ProfitRevision,
}

impl ScoreFactor {
    /// All factors in report order.
    pub const ALL: [Self; 13] = [
        Self::ReturnOnEquity,
        Self::EbitMargin,
        Self::EquityRatio,
        Self::CurrentPe,
        Self::FiveYearPe,
        Self::AnalystRecommendation,
        Self::QuarterlyReaction,
        Self::SixMonthMove,
        Self::TwelveMonthMove,
        Self::Momentum,
        Self::Reversal,
        Self::ProfitGrowth,
        Self::ProfitRevision,
    ];

    /// Report label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ReturnOnEquity => "Return on equity",
            Self::EbitMargin => "EBIT margin",
            Self::EquityRatio => "Equity ratio",
            Self::CurrentPe => "P/E current year",
            Self::FiveYearPe => "P/E 5 years",
            Self::AnalystRecommendation => "Analyst recommendation",
            Self::QuarterlyReaction => "Quarterly report reaction",
            Self::SixMonthMove => "Price change 6 months",
            Self::TwelveMonthMove => "Price change 12 months",
            Self::Momentum => "Price momentum",
            Self::Reversal => "3-month reversal",
            Self::ProfitGrowth => "Profit growth",
            Self::ProfitRevision => "Profit revision",
        }
    }
}

impl fmt::Display for ScoreFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Three-month reversal classification.
///
/// The stock consistently trailing the index scores +1, leading it scores
/// -1. This is the mean-reversion reading and is kept as is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reversal {
    /// Stock below the index in every month.
    StockAlwaysWorse,
    /// Stock above the index in every month.
    StockAlwaysBetter,
    /// Anything else.
    Mixed,
}

impl Reversal {
    /// Classifies paired monthly changes, newest first.
    #[must_use]
    pub fn classify(stock: &[f64], index: &[f64]) -> Self {
        let pairs = || stock.iter().zip(index);
        if stock.is_empty() || stock.len() != index.len() {
            Self::Mixed
        } else if pairs().all(|(s, i)| s < i) {
            Self::StockAlwaysWorse
        } else if pairs().all(|(s, i)| s > i) {
            Self::StockAlwaysBetter
        } else {
            Self::Mixed
        }
    }

    /// Score contribution.
    #[must_use]
    pub const fn points(self) -> i8 {
        match self {
            Self::StockAlwaysWorse => 1,
            Self::StockAlwaysBetter => -1,
            Self::Mixed => 0,
        }
    }

    const fn describe(self) -> &'static str {
        match self {
            Self::StockAlwaysWorse => "stock always worse than index",
            Self::StockAlwaysBetter => "stock always better than index",
            Self::Mixed => "mixed",
        }
    }
}

/// Final recommendation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Score at or above the buy cut-off.
    Buy,
    /// Score at or above the hold cut-off.
    Hold,
    /// Anything lower.
    Sell,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Buy => "Buy",
            Self::Hold => "Hold",
            Self::Sell => "Sell",
        })
    }
}

/// Raw factor inputs. Ratios and changes are in percent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreInputs {
    /// Mean operating income over equity.
    pub return_on_equity: Option<f64>,
    /// Mean EBIT over revenue.
    pub ebit_margin: Option<f64>,
    /// Mean equity over assets.
    pub equity_ratio: Option<f64>,
    /// Price over current-year EPS estimate.
    pub current_pe: Option<f64>,
    /// Price over five-year average EPS.
    pub five_year_pe: Option<f64>,
    /// Mean analyst rating.
    pub recommendation: Option<f64>,
    /// Stock minus index report reaction.
    pub quarterly_reaction: Option<f64>,
    /// Six-month price change.
    pub six_month_move: Option<f64>,
    /// Twelve-month price change.
    pub twelve_month_move: Option<f64>,
    /// Three-month reversal classification.
    pub reversal: Option<Reversal>,
    /// EPS estimate growth.
    pub profit_growth: Option<f64>,
    /// Market capitalization.
    pub market_cap: Option<f64>,
    /// Why an input is absent.
    pub notes: BTreeMap<ScoreFactor, String>,
}

impl ScoreInputs {
    fn skip(&mut self, factor: ScoreFactor, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(%factor, %reason, "Score factor skipped");
        self.notes.insert(factor, reason);
    }

    fn skip_lookup(&mut self, factor: ScoreFactor, err: &AnalysisError) {
        match err {
            AnalysisError::DateLookupFailure { .. } => {
                error!(%factor, error = %err, "Date lookup failed");
                self.notes.insert(factor, err.to_string());
            }
            other => self.skip(factor, other.to_string()),
        }
    }
}

/// Contribution of one factor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FactorScore {
    /// Which factor.
    pub factor: ScoreFactor,
    /// Input value, when the factor has a numeric one.
    pub input: Option<f64>,
    /// -1, 0 or +1.
    pub points: i8,
    /// Classification or the reason the factor was not computed.
    pub note: Option<String>,
}

/// The full score breakdown.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    /// One entry per factor, in report order.
    pub factors: Vec<FactorScore>,
    /// Sum of all points.
    pub total: i32,
    /// Market cap bucket, if the market cap is known.
    pub bucket: Option<CapBucket>,
    /// Verdict, if the market cap is known.
    pub verdict: Option<Verdict>,
}

impl ScoreCard {
    /// Points of one factor.
    #[must_use]
    pub fn points(&self, factor: ScoreFactor) -> i8 {
        self.factors
            .iter()
            .find(|f| f.factor == factor)
            .map_or(0, |f| f.points)
    }
}

/// Maps factor inputs through the thresholds.
#[must_use]
pub fn score_from_inputs(inputs: &ScoreInputs, thresholds: &ScoringThresholds) -> ScoreCard {
    let t = thresholds;
    let numeric = |factor: ScoreFactor, input: Option<f64>, rule: &dyn Fn(f64) -> i8| {
        let input = input.filter(|v| v.is_finite());
        FactorScore {
            factor,
            input,
            points: input.map_or(0, rule),
            note: match input {
                Some(_) => None,
                None => Some(
                    inputs
                        .notes
                        .get(&factor)
                        .cloned()
                        .unwrap_or_else(|| "missing".to_string()),
                ),
            },
        }
    };

    let momentum = match (inputs.six_month_move, inputs.twelve_month_move) {
        (Some(six), Some(twelve)) => {
            let (points, label) = if six > t.momentum.high && twelve < t.momentum.high {
                (1, "rising")
            } else if six < t.momentum.low && twelve > t.momentum.low {
                (-1, "falling")
            } else {
                (0, "neutral")
            };
            FactorScore {
                factor: ScoreFactor::Momentum,
                input: None,
                points,
                note: Some(label.to_string()),
            }
        }
        _ => FactorScore {
            factor: ScoreFactor::Momentum,
            input: None,
            points: 0,
            note: Some("requires both price changes".to_string()),
        },
    };

    let reversal = FactorScore {
        factor: ScoreFactor::Reversal,
        input: None,
        points: inputs.reversal.map_or(0, Reversal::points),
        note: Some(match inputs.reversal {
            Some(r) => r.describe().to_string(),
            None => inputs
                .notes
                .get(&ScoreFactor::Reversal)
                .cloned()
                .unwrap_or_else(|| "missing".to_string()),
        }),
    };

    let factors = vec![
        numeric(ScoreFactor::ReturnOnEquity, inputs.return_on_equity, &|v| t.return_on_equity.score(v)),
        numeric(ScoreFactor::EbitMargin, inputs.ebit_margin, &|v| t.ebit_margin.score(v)),
        numeric(ScoreFactor::EquityRatio, inputs.equity_ratio, &|v| t.equity_ratio.score(v)),
        numeric(ScoreFactor::CurrentPe, inputs.current_pe, &|v| t.current_pe.score_inverse(v)),
        numeric(ScoreFactor::FiveYearPe, inputs.five_year_pe, &|v| t.five_year_pe.score_inverse(v)),
        numeric(ScoreFactor::AnalystRecommendation, inputs.recommendation, &|v| {
            t.recommendation.score_inclusive(v)
        }),
        numeric(ScoreFactor::QuarterlyReaction, inputs.quarterly_reaction, &|v| {
            t.quarterly_reaction.score(v)
        }),
        numeric(ScoreFactor::SixMonthMove, inputs.six_month_move, &|v| t.price_move.score(v)),
        numeric(ScoreFactor::TwelveMonthMove, inputs.twelve_month_move, &|v| t.price_move.score(v)),
        momentum,
        reversal,
        numeric(ScoreFactor::ProfitGrowth, inputs.profit_growth, &|v| t.profit_growth.score(v)),
        FactorScore {
            factor: ScoreFactor::ProfitRevision,
            input: None,
            points: 0,
            note: Some("not implemented".to_string()),
        },
    ];

    let total = factors.iter().map(|f| i32::from(f.points)).sum();
    let bucket = inputs
        .market_cap
        .filter(|c| c.is_finite())
        .map(|c| t.market_cap.classify(c));
    let verdict = bucket.map(|b| {
        let cutoffs = t.market_cap.cutoffs(b);
        if total >= cutoffs.buy {
            Verdict::Buy
        } else if total >= cutoffs.hold {
            Verdict::Hold
        } else {
            Verdict::Sell
        }
    });

    ScoreCard {
        factors,
        total,
        bucket,
        verdict,
    }
}

/// Mean of `num / den × 100` over periods where both are finite and the
/// denominator is non-zero.
fn mean_ratio_percent(num: &MetricSeries, den: &MetricSeries) -> Option<f64> {
    let ratios: Vec<f64> = num
        .iter()
        .filter_map(|(period, n)| {
            let d = den.get(period)?;
            (n.is_finite() && d.is_finite() && d != 0.0).then(|| n / d * 100.0)
        })
        .collect();
    mean(&ratios)
}

fn percent_change(from: f64, to: f64) -> Option<f64> {
    let change = (to / from - 1.0) * 100.0;
    change.is_finite().then_some(change)
}

/// Computes the multi-factor score of an instrument.
#[derive(Clone, Debug, Default)]
pub struct ScoringEngine {
    thresholds: ScoringThresholds,
    nearest: NearestDateConfig,
}

impl ScoringEngine {
    /// Creates an engine.
    #[must_use]
    pub const fn new(thresholds: ScoringThresholds, nearest: NearestDateConfig) -> Self {
        Self {
            thresholds,
            nearest,
        }
    }

    /// The engine's thresholds.
    #[must_use]
    pub const fn thresholds(&self) -> &ScoringThresholds {
        &self.thresholds
    }

    /// Scores an instrument against a reference index as of a date.
    pub fn score(
        &self,
        facts: &FinancialFactTable,
        index: &PriceHistory,
        report_dates: &ReportDates,
        as_of: NaiveDate,
    ) -> AnalysisResult<ScoreCard> {
        let inputs = self.inputs(facts, index, report_dates, as_of)?;
        let card = score_from_inputs(&inputs, &self.thresholds);
        debug!(symbol = %facts.symbol(), total = card.total, verdict = ?card.verdict, "Scored");
        Ok(card)
    }

    /// Derives the raw factor inputs.
    ///
    /// Fails only when a profitability statement is missing entirely.
    pub fn inputs(
        &self,
        facts: &FinancialFactTable,
        index: &PriceHistory,
        report_dates: &ReportDates,
        as_of: NaiveDate,
    ) -> AnalysisResult<ScoreInputs> {
        let statements = facts.statements();
        let scope = "score";
        let equity = statements.require(&Metric::StockholdersEquity, scope)?;
        let operating_income = statements.require(&Metric::OperatingIncome, scope)?;
        let ebit = statements.require(&Metric::Ebit, scope)?;
        let revenue = statements.require(&Metric::TotalRevenue, scope)?;
        let assets = statements.require(&Metric::TotalAssets, scope)?;
        let diluted_eps = statements.require(&Metric::DilutedEps, scope)?;

        let common = |num: &MetricSeries, den: &MetricSeries, metric: Metric| {
            mean_ratio_percent(num, den).ok_or_else(|| AnalysisError::MissingMetric {
                metric,
                scope: "common periods".to_string(),
            })
        };

        let mut inputs = ScoreInputs {
            return_on_equity: Some(common(operating_income, equity, Metric::OperatingIncome)?),
            ebit_margin: Some(common(ebit, revenue, Metric::Ebit)?),
            equity_ratio: Some(common(equity, assets, Metric::StockholdersEquity)?),
            market_cap: facts.key_stats().market_cap,
            ..Default::default()
        };

        self.valuation_inputs(&mut inputs, facts, diluted_eps, as_of);
        self.price_inputs(&mut inputs, facts.history(), index, report_dates, as_of);
        Ok(inputs)
    }

    fn valuation_inputs(
        &self,
        inputs: &mut ScoreInputs,
        facts: &FinancialFactTable,
        diluted_eps: &MetricSeries,
        as_of: NaiveDate,
    ) {
        let price = facts.basic().price.filter(|p| p.is_finite());
        let (current, next) = current_and_next(facts.eps_estimates(), as_of);
        let current = current.and_then(|e| e.eps_avg).filter(|v| v.is_finite());
        let next = next.and_then(|e| e.eps_avg).filter(|v| v.is_finite());

        match (price, current) {
            (Some(p), Some(eps)) if eps != 0.0 => inputs.current_pe = Some(p / eps),
            (None, _) => inputs.skip(ScoreFactor::CurrentPe, "no price"),
            _ => inputs.skip(ScoreFactor::CurrentPe, "no current-year EPS estimate"),
        }

        let mut eps_values: Vec<f64> = diluted_eps.last_n(3).into_iter().map(|(_, v)| v).collect();
        eps_values.push(current.unwrap_or(f64::NAN));
        eps_values.push(next.unwrap_or(f64::NAN));
        let finite: Vec<f64> = eps_values.iter().copied().filter(|v| v.is_finite()).collect();
        // NaN cells filled with the mean of the rest leave the mean unchanged.
        match (price, mean(&finite)) {
            (Some(p), Some(avg)) if avg != 0.0 => inputs.five_year_pe = Some(p / avg),
            (None, _) => inputs.skip(ScoreFactor::FiveYearPe, "no price"),
            _ => inputs.skip(ScoreFactor::FiveYearPe, "no EPS values"),
        }

        match latest_trend(facts.recommendations()).and_then(|t| t.mean()) {
            Some(m) => inputs.recommendation = Some(m),
            None => inputs.skip(ScoreFactor::AnalystRecommendation, "no recommendations"),
        }

        match (current, next) {
            (Some(c), Some(n)) if c != 0.0 => inputs.profit_growth = percent_change(c, n),
            _ => inputs.skip(ScoreFactor::ProfitGrowth, "needs current and next-year EPS estimates"),
        }
    }

    fn price_inputs(
        &self,
        inputs: &mut ScoreInputs,
        stock: &PriceHistory,
        index: &PriceHistory,
        report_dates: &ReportDates,
        as_of: NaiveDate,
    ) {
        match report_dates.latest_quarterly_report(as_of) {
            None => inputs.skip(ScoreFactor::QuarterlyReaction, "no quarterly report date"),
            Some(_) if stock.is_empty() || index.is_empty() => {
                inputs.skip(ScoreFactor::QuarterlyReaction, "no price history");
            }
            Some(date) => match self.report_reaction(stock, index, date) {
                Ok(Some(reaction)) => inputs.quarterly_reaction = Some(reaction),
                Ok(None) => inputs.skip(ScoreFactor::QuarterlyReaction, "no bar after report"),
                Err(e) => inputs.skip_lookup(ScoreFactor::QuarterlyReaction, &e),
            },
        }

        if stock.is_empty() {
            for factor in [ScoreFactor::SixMonthMove, ScoreFactor::TwelveMonthMove] {
                inputs.skip(factor, "no price history");
            }
        } else {
            for (factor, months) in [(ScoreFactor::SixMonthMove, 6), (ScoreFactor::TwelveMonthMove, 12)] {
                match self.price_move(stock, as_of, months) {
                    Ok(change) => {
                        let slot = match factor {
                            ScoreFactor::SixMonthMove => &mut inputs.six_month_move,
                            _ => &mut inputs.twelve_month_move,
                        };
                        *slot = change;
                    }
                    Err(e) => inputs.skip_lookup(factor, &e),
                }
            }
        }

        if stock.is_empty() || index.is_empty() {
            inputs.skip(ScoreFactor::Reversal, "no price history");
        } else {
            match (self.monthly_changes(stock, as_of), self.monthly_changes(index, as_of)) {
                (Ok(s), Ok(i)) => inputs.reversal = Some(Reversal::classify(&s, &i)),
                (Err(e), _) | (_, Err(e)) => inputs.skip_lookup(ScoreFactor::Reversal, &e),
            }
        }
    }

    /// Open-to-next-open change of the stock minus that of the index.
    fn report_reaction(
        &self,
        stock: &PriceHistory,
        index: &PriceHistory,
        report: NaiveDate,
    ) -> AnalysisResult<Option<f64>> {
        let reaction = |history: &PriceHistory| -> AnalysisResult<Option<f64>> {
            let day = resolve_in(history, report, &self.nearest)?;
            let open = history.bar_on(day).map(|b| b.open);
            let next_open = history.next_bar_after(day).map(|b| b.open);
            Ok(open
                .zip(next_open)
                .and_then(|(from, to)| percent_change(from, to)))
        };
        let stock_change = reaction(stock)?;
        let index_change = reaction(index)?;
        Ok(stock_change.zip(index_change).map(|(s, i)| s - i))
    }

    fn price_move(
        &self,
        history: &PriceHistory,
        as_of: NaiveDate,
        months: u32,
    ) -> AnalysisResult<Option<f64>> {
        let then = months_before(as_of, months)?;
        let now = close_near(history, as_of, &self.nearest)?;
        let past = close_near(history, then, &self.nearest)?;
        Ok(percent_change(past, now))
    }

    /// Month-over-month close changes for the last three months, newest first.
    fn monthly_changes(&self, history: &PriceHistory, as_of: NaiveDate) -> AnalysisResult<Vec<f64>> {
        let closes = (0..=3)
            .map(|m| {
                let date = months_before(as_of, m)?;
                close_near(history, date, &self.nearest)
            })
            .collect::<AnalysisResult<Vec<f64>>>()?;
        Ok(closes
            .windows(2)
            .filter_map(|w| percent_change(w[1], w[0]))
            .collect())
    }
}

fn months_before(date: NaiveDate, months: u32) -> AnalysisResult<NaiveDate> {
    date.checked_sub_months(Months::new(months))
        .ok_or_else(|| AnalysisError::InsufficientData(format!("{months} months before {date}")))
}
