//! Intrinsic value estimates: weighted EPS, Graham Number and DCF.
//!
//! Two margin-of-safety conventions coexist here and are not
//! interchangeable. The DCF divides by `1 + m` ([`haircut_divisor`]); the
//! earnings-based fair value multiplies by `1 - m` ([`haircut_multiplier`]).
//! For `m = 0.2` the first keeps 83.3% of the value, the second 80%.

use intrinsic_core::{
    AnalysisError, AnalysisResult, Assumptions, DcfAssumptions, FinancialFactTable, Metric,
    series::mean,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::policy::{EpsWeighting, ValuationPolicy};

/// Number of explicitly projected years.
pub const PROJECTION_YEARS: u32 = 10;

/// Years projected with the first growth rate.
const FIRST_PHASE_YEARS: u32 = 5;

/// Mean of `values` under an EPS weighting policy.
///
/// Non-finite values are dropped first. Under
/// [`EpsWeighting::YearWeighted`] the remaining values, oldest first, get
/// weights `1, 1+step, 1+2·step, ...`.
#[must_use]
pub fn weighted_mean(values: &[f64], weighting: EpsWeighting) -> Option<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    match weighting {
        EpsWeighting::Unweighted => mean(&finite),
        EpsWeighting::YearWeighted { step } => {
            if finite.is_empty() {
                return None;
            }
            let (sum, weights) = finite
                .iter()
                .enumerate()
                .fold((0.0, 0.0), |(sum, weights), (i, v)| {
                    let w = 1.0 + i as f64 * step;
                    (sum + w * v, weights + w)
                });
            Some(sum / weights)
        }
    }
}

/// `sqrt(15 × eps × 1.5 × book_value_per_share)`.
///
/// A negative EPS is clamped to zero. A negative book value is not clamped,
/// so the result is NaN for a positive EPS.
#[must_use]
pub fn graham_number(eps: f64, book_value_per_share: f64) -> f64 {
    let eps = if eps < 0.0 {
        warn!(eps, "Negative EPS clamped to 0 for Graham Number");
        0.0
    } else {
        eps
    };
    if book_value_per_share < 0.0 {
        warn!(book_value_per_share, "Negative book value per share in Graham Number");
    }
    (15.0 * eps * 1.5 * book_value_per_share).sqrt()
}

/// Margin of safety applied as a divisor: `value / (1 + margin)`.
#[must_use]
pub fn haircut_divisor(value: f64, margin_of_safety: f64) -> f64 {
    value / (1.0 + margin_of_safety)
}

/// Margin of safety applied as a discount: `value × (1 − margin)`.
#[must_use]
pub fn haircut_multiplier(value: f64, margin_of_safety: f64) -> f64 {
    value * (1.0 - margin_of_safety)
}

/// Earnings-based fair value.
///
/// Projects EPS `horizon_years` ahead at `growth`, prices it at `pe`,
/// discounts it back at `expected_return` and applies the margin of safety
/// multiplicatively. Rates are fractions.
#[must_use]
pub fn earnings_fair_value(
    eps: f64,
    growth: f64,
    pe: f64,
    expected_return: f64,
    margin_of_safety: f64,
    horizon_years: u32,
) -> f64 {
    let horizon = horizon_years as i32;
    let future_eps = eps * (1.0 + growth).powi(horizon);
    let future_price = future_eps * pe;
    let fair = future_price / (1.0 + expected_return).powi(horizon);
    haircut_multiplier(fair, margin_of_safety)
}

/// Ordinary least squares fit of `values` against their index.
///
/// Returns `(intercept, slope)`. Needs at least two values.
fn linear_trend(values: &[f64]) -> Option<(f64, f64)> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;
    let (sxy, sxx) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(sxy, sxx), (i, y)| {
            let dx = i as f64 - mean_x;
            (sxy + dx * (y - mean_y), sxx + dx * dx)
        });
    let slope = sxy / sxx;
    Some((mean_y - slope * mean_x, slope))
}

/// One projected year of a DCF.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DcfYear {
    /// Year offset, 1 to 10.
    pub year: u32,
    /// Projected free cash flow.
    pub cash_flow: f64,
    /// `(1 + r)^year`.
    pub discount_factor: f64,
    /// Cash flow divided by the discount factor.
    pub present_value: f64,
}

/// Result of a discounted cash flow valuation, with its year table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DcfValuation {
    /// Assumptions used, as fractions.
    pub assumptions: DcfAssumptions,
    /// Intercept and slope of the linear trend of historical free cash flow.
    pub trend: (f64, f64),
    /// Mean of the trend at the latest period and the latest actual value.
    pub start_value: f64,
    /// Projected years 1 to 10.
    pub years: Vec<DcfYear>,
    /// Perpetuity value at year 10.
    pub terminal_value: f64,
    /// Perpetuity value discounted to today.
    pub terminal_present_value: f64,
    /// Sum of all present values.
    pub total_present_value: f64,
    /// Shares outstanding.
    pub shares_outstanding: f64,
    /// Total present value per share, before the margin of safety.
    pub value_per_share: f64,
    /// Value per share after the margin of safety.
    pub fair_value: f64,
}

/// Everything the valuation engine computes for one instrument.
///
/// Each field fails independently.
#[derive(Clone, Debug, PartialEq)]
pub struct Valuation {
    /// Weighted EPS.
    pub eps: AnalysisResult<f64>,
    /// P/E, forward preferred.
    pub pe: Option<f64>,
    /// Dividend yield as a fraction.
    pub dividend_yield: AnalysisResult<f64>,
    /// Graham Number.
    pub graham_number: AnalysisResult<f64>,
    /// DCF fair value.
    pub dcf: AnalysisResult<DcfValuation>,
    /// Earnings-based fair value.
    pub earnings_fair_value: AnalysisResult<f64>,
}

/// Computes valuation figures from a fact table.
#[derive(Clone, Debug, Default)]
pub struct ValuationEngine {
    policy: ValuationPolicy,
}

impl ValuationEngine {
    /// Creates an engine with a policy.
    #[must_use]
    pub const fn new(policy: ValuationPolicy) -> Self {
        Self { policy }
    }

    /// The engine's policy.
    #[must_use]
    pub const fn policy(&self) -> &ValuationPolicy {
        &self.policy
    }

    /// Weighted EPS.
    ///
    /// Uses the multi-year diluted EPS series when it has at least two finite
    /// values, else the scalar EPS from basic data.
    pub fn weighted_eps(&self, facts: &FinancialFactTable) -> AnalysisResult<f64> {
        if let Some(series) = facts.statements().series(&Metric::DilutedEps) {
            let values = series.finite_values();
            if values.len() >= 2 {
                if let Some(eps) = weighted_mean(&values, self.policy.eps_weighting) {
                    return Ok(eps);
                }
            }
        }
        facts
            .basic()
            .eps()
            .ok_or(AnalysisError::MissingBasicData("EPS"))
    }

    /// Graham Number from weighted EPS and book value per share.
    pub fn graham(&self, facts: &FinancialFactTable) -> AnalysisResult<f64> {
        let eps = self.weighted_eps(facts)?;
        let bvps = facts
            .basic()
            .book_value_per_share
            .filter(|v| v.is_finite())
            .ok_or(AnalysisError::MissingBasicData("book value per share"))?;
        Ok(graham_number(eps, bvps))
    }

    /// Three-phase discounted cash flow fair value per share.
    pub fn discounted_cash_flow(
        &self,
        facts: &FinancialFactTable,
        assumptions: &Assumptions,
    ) -> AnalysisResult<DcfValuation> {
        let dcf = assumptions.complete()?;
        let r = dcf.discount_rate;
        let g_perp = dcf.perpetual_growth;
        if r <= g_perp {
            return Err(AnalysisError::DegenerateDcf {
                discount_rate: r * 100.0,
                perpetual_growth: g_perp * 100.0,
            });
        }

        let series = facts
            .statements()
            .require(&Metric::FreeCashFlow, "discounted cash flow")?;
        if series.len() < 2 || series.finite_values().is_empty() {
            return Err(AnalysisError::InsufficientData(format!(
                "free cash flow needs at least two periods with a value, got {} of which {} finite",
                series.len(),
                series.finite_values().len()
            )));
        }
        let history = series.fill_missing_with_mean().values();
        let (intercept, slope) = linear_trend(&history)
            .ok_or_else(|| AnalysisError::InsufficientData("free cash flow trend".to_string()))?;
        let last_index = (history.len() - 1) as f64;
        let last_actual = history[history.len() - 1];
        let start_value = (intercept + slope * last_index + last_actual) / 2.0;
        debug!(intercept, slope, start_value, "Free cash flow trend");

        let mut years = Vec::with_capacity(PROJECTION_YEARS as usize);
        let mut cash_flow = start_value;
        for year in 1..=PROJECTION_YEARS {
            let growth = if year <= FIRST_PHASE_YEARS {
                dcf.growth_1_to_5
            } else {
                dcf.growth_6_to_10
            };
            cash_flow *= 1.0 + growth;
            let discount_factor = (1.0 + r).powi(year as i32);
            years.push(DcfYear {
                year,
                cash_flow,
                discount_factor,
                present_value: cash_flow / discount_factor,
            });
        }

        let terminal_value = cash_flow * (1.0 + g_perp) / (r - g_perp);
        let terminal_present_value = terminal_value / (1.0 + r).powi(PROJECTION_YEARS as i32);
        let total_present_value =
            years.iter().map(|y| y.present_value).sum::<f64>() + terminal_present_value;

        let shares_outstanding = facts
            .key_stats()
            .shares_outstanding
            .filter(|s| s.is_finite() && *s > 0.0)
            .ok_or(AnalysisError::MissingBasicData("shares outstanding"))?;
        let value_per_share = total_present_value / shares_outstanding;

        Ok(DcfValuation {
            assumptions: dcf,
            trend: (intercept, slope),
            start_value,
            years,
            terminal_value,
            terminal_present_value,
            total_present_value,
            shares_outstanding,
            value_per_share,
            fair_value: haircut_divisor(value_per_share, dcf.margin_of_safety),
        })
    }

    /// Earnings-based fair value using the first-phase growth rate, the
    /// discount rate as expected return and the current P/E.
    pub fn earnings_value(
        &self,
        facts: &FinancialFactTable,
        assumptions: &Assumptions,
    ) -> AnalysisResult<f64> {
        let dcf = assumptions.complete()?;
        let eps = self.weighted_eps(facts)?;
        let pe = facts.basic().pe().ok_or(AnalysisError::MissingBasicData("P/E"))?;
        Ok(earnings_fair_value(
            eps,
            dcf.growth_1_to_5,
            pe,
            dcf.discount_rate,
            dcf.margin_of_safety,
            self.policy.earnings_horizon_years,
        ))
    }

    /// Computes every valuation figure.
    pub fn compute(&self, facts: &FinancialFactTable, assumptions: &Assumptions) -> Valuation {
        let valuation = Valuation {
            eps: self.weighted_eps(facts),
            pe: facts.basic().pe(),
            dividend_yield: facts
                .basic()
                .dividend_yield(self.policy.coerce_missing_dividend),
            graham_number: self.graham(facts),
            dcf: self.discounted_cash_flow(facts, assumptions),
            earnings_fair_value: self.earnings_value(facts, assumptions),
        };
        if let Err(e) = &valuation.dcf {
            warn!(symbol = %facts.symbol(), error = %e, "DCF cannot be calculated");
        }
        valuation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use intrinsic_core::{
        BasicData, FiscalPeriod, KeyStatistics, StatementTable, Symbol,
    };
    use rstest::rstest;

    fn fy(year: i32) -> FiscalPeriod {
        FiscalPeriod::from_ymd(year, 12, 31).unwrap()
    }

    fn facts_with(table: StatementTable) -> FinancialFactTable {
        FinancialFactTable::new(Symbol::new("TEST"))
            .with_statements(&table)
            .with_key_stats(&KeyStatistics {
                shares_outstanding: Some(1.0e9),
                market_cap: Some(8.0e9),
            })
    }

    fn fcf_facts() -> FinancialFactTable {
        facts_with(
            [
                (Metric::FreeCashFlow, fy(2019), 1.0e9),
                (Metric::FreeCashFlow, fy(2020), 1.1e9),
                (Metric::FreeCashFlow, fy(2021), 1.21e9),
            ]
            .into_iter()
            .collect(),
        )
    }

    fn assumptions() -> Assumptions {
        Assumptions::from_percent(10.0, 20.0, 8.0, 5.0, 2.0)
    }

    #[test]
    fn test_graham_clamps_negative_eps() {
        assert_eq!(graham_number(-5.0, 10.0), graham_number(0.0, 10.0));
        assert_eq!(graham_number(-5.0, 10.0), 0.0);
    }

    #[test]
    fn test_graham_number() {
        // sqrt(15 * 2 * 1.5 * 20) = sqrt(900)
        assert_relative_eq!(graham_number(2.0, 20.0), 30.0);
        assert!(graham_number(2.0, -20.0).is_nan());
    }

    #[test]
    fn test_unweighted_eps_is_order_invariant() {
        let a = [1.0, 2.0, f64::NAN, 6.0];
        let b = [6.0, f64::NAN, 1.0, 2.0];
        let ma = weighted_mean(&a, EpsWeighting::Unweighted).unwrap();
        let mb = weighted_mean(&b, EpsWeighting::Unweighted).unwrap();
        assert_relative_eq!(ma, 3.0);
        assert_relative_eq!(ma, mb);
    }

    #[test]
    fn test_year_weighted_eps_favors_newest() {
        // weights 1, 1.5, 2 over oldest-first values
        let eps = weighted_mean(&[1.0, 2.0, 3.0], EpsWeighting::year_weighted()).unwrap();
        assert_relative_eq!(eps, (1.0 + 3.0 + 6.0) / 4.5);
        assert!(eps > 2.0);
    }

    #[test]
    fn test_weighted_eps_falls_back_to_basic() {
        let engine = ValuationEngine::default();
        let table: StatementTable = [(Metric::DilutedEps, fy(2023), 4.0)].into_iter().collect();
        let facts = facts_with(table).with_basic(&BasicData {
            trailing_eps: Some(3.5),
            ..Default::default()
        });
        assert_relative_eq!(engine.weighted_eps(&facts).unwrap(), 3.5);

        let empty = facts_with(StatementTable::new());
        assert_eq!(
            engine.weighted_eps(&empty),
            Err(AnalysisError::MissingBasicData("EPS"))
        );
    }

    #[rstest]
    #[case::one_finite(&[(2022, 4.0), (2023, f64::NAN)], 3.5)]
    #[case::all_nan(&[(2022, f64::NAN), (2023, f64::NAN)], 3.5)]
    #[case::two_finite(&[(2021, 4.0), (2022, f64::NAN), (2023, 6.0)], 5.0)]
    fn test_weighted_eps_needs_two_finite_values(
        #[case] rows: &[(i32, f64)],
        #[case] expected: f64,
    ) {
        let table: StatementTable = rows
            .iter()
            .map(|&(year, eps)| (Metric::DilutedEps, fy(year), eps))
            .collect();
        let facts = facts_with(table).with_basic(&BasicData {
            trailing_eps: Some(3.5),
            ..Default::default()
        });
        assert_relative_eq!(ValuationEngine::default().weighted_eps(&facts).unwrap(), expected);
    }

    #[test]
    fn test_weighted_eps_from_series() {
        let engine = ValuationEngine::new(ValuationPolicy {
            eps_weighting: EpsWeighting::year_weighted(),
            ..Default::default()
        });
        let table: StatementTable = [
            (Metric::DilutedEps, fy(2021), 2.0),
            (Metric::DilutedEps, fy(2022), f64::NAN),
            (Metric::DilutedEps, fy(2023), 4.0),
        ]
        .into_iter()
        .collect();
        // NaN dropped, weights 1 and 1.5
        assert_relative_eq!(engine.weighted_eps(&facts_with(table)).unwrap(), 8.0 / 2.5);
    }

    #[test]
    fn test_dcf_end_to_end() {
        let dcf = ValuationEngine::default()
            .discounted_cash_flow(&fcf_facts(), &assumptions())
            .unwrap();

        assert_relative_eq!(dcf.trend.1, 1.05e8, max_relative = 1e-12);
        assert_relative_eq!(dcf.start_value, 1_209_166_666.666_666_5, max_relative = 1e-12);
        assert_eq!(dcf.years.len(), 10);
        assert_relative_eq!(dcf.years[0].cash_flow, dcf.start_value * 1.08, max_relative = 1e-12);
        assert_relative_eq!(
            dcf.years[5].cash_flow,
            dcf.years[4].cash_flow * 1.05,
            max_relative = 1e-12
        );
        assert_relative_eq!(dcf.total_present_value, 21_678_088_599.578_445, max_relative = 1e-9);
        assert_relative_eq!(dcf.fair_value, 18.065_073_832_982_037, max_relative = 1e-9);
        assert_relative_eq!(dcf.fair_value, dcf.value_per_share / 1.2, max_relative = 1e-12);
    }

    #[test]
    fn test_dcf_degenerate_rates() {
        let engine = ValuationEngine::default();
        for (rate, perp) in [(2.0, 2.0), (2.0, 3.0), (0.0, 0.5)] {
            let err = engine
                .discounted_cash_flow(&fcf_facts(), &Assumptions::from_percent(rate, 20.0, 8.0, 5.0, perp))
                .unwrap_err();
            assert!(matches!(err, AnalysisError::DegenerateDcf { .. }));
        }
    }

    #[test]
    fn test_dcf_incomplete_assumptions() {
        let mut partial = assumptions();
        partial.growth_year_6_to_10 = None;
        let err = ValuationEngine::default()
            .discounted_cash_flow(&fcf_facts(), &partial)
            .unwrap_err();
        assert_eq!(
            err,
            AnalysisError::IncompleteAssumptions {
                missing: vec!["growth_year_6_to_10"]
            }
        );
    }

    #[test]
    fn test_dcf_requires_two_periods() {
        let facts = facts_with([(Metric::FreeCashFlow, fy(2021), 1.0e9)].into_iter().collect());
        let err = ValuationEngine::default()
            .discounted_cash_flow(&facts, &assumptions())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientData(_)));

        let missing = ValuationEngine::default()
            .discounted_cash_flow(&facts_with(StatementTable::new()), &assumptions())
            .unwrap_err();
        assert!(matches!(missing, AnalysisError::MissingMetric { .. }));
    }

    #[test]
    fn test_dcf_fills_nan_with_mean() {
        let with_gap = facts_with(
            [
                (Metric::FreeCashFlow, fy(2019), 1.0e9),
                (Metric::FreeCashFlow, fy(2020), f64::NAN),
                (Metric::FreeCashFlow, fy(2021), 1.2e9),
            ]
            .into_iter()
            .collect(),
        );
        let filled = facts_with(
            [
                (Metric::FreeCashFlow, fy(2019), 1.0e9),
                (Metric::FreeCashFlow, fy(2020), 1.1e9),
                (Metric::FreeCashFlow, fy(2021), 1.2e9),
            ]
            .into_iter()
            .collect(),
        );
        let engine = ValuationEngine::default();
        let a = engine.discounted_cash_flow(&with_gap, &assumptions()).unwrap();
        let b = engine.discounted_cash_flow(&filled, &assumptions()).unwrap();
        assert_relative_eq!(a.fair_value, b.fair_value, max_relative = 1e-12);
    }

    #[test]
    fn test_dcf_requires_shares() {
        let facts = FinancialFactTable::new(Symbol::new("TEST")).with_statements(
            &[
                (Metric::FreeCashFlow, fy(2020), 1.0e9),
                (Metric::FreeCashFlow, fy(2021), 1.1e9),
            ]
            .into_iter()
            .collect(),
        );
        assert_eq!(
            ValuationEngine::default().discounted_cash_flow(&facts, &assumptions()),
            Err(AnalysisError::MissingBasicData("shares outstanding"))
        );
    }

    #[test]
    fn test_margin_conventions_differ() {
        assert_relative_eq!(haircut_divisor(120.0, 0.2), 100.0);
        assert_relative_eq!(haircut_multiplier(120.0, 0.2), 96.0);
    }

    #[test]
    fn test_earnings_fair_value() {
        // zero growth and return: eps * pe * (1 - m)
        assert_relative_eq!(earnings_fair_value(2.0, 0.0, 15.0, 0.0, 0.2, 10), 24.0);
        let v = earnings_fair_value(2.0, 0.1, 15.0, 0.1, 0.0, 10);
        assert_relative_eq!(v, 30.0, max_relative = 1e-12);
    }

    #[test]
    fn test_compute_isolates_failures() {
        let facts = fcf_facts().with_basic(&BasicData {
            price: Some(50.0),
            trailing_eps: Some(2.0),
            forward_pe: Some(14.0),
            book_value_per_share: Some(20.0),
            ..Default::default()
        });
        let valuation = ValuationEngine::default().compute(&facts, &Assumptions::default());
        assert!(valuation.dcf.is_err());
        assert!(valuation.earnings_fair_value.is_err());
        assert_eq!(
            valuation.dividend_yield,
            Err(AnalysisError::MissingBasicData("dividend rate"))
        );
        assert_relative_eq!(valuation.graham_number.unwrap(), 30.0);
        assert_eq!(valuation.pe, Some(14.0));
    }
}
