//! Latest-period profitability ratios with a short qualitative comment.

use intrinsic_core::{
    AnalysisError, AnalysisResult, FinancialFactTable, FiscalPeriod, Metric, MetricSeries,
};
use serde::{Deserialize, Serialize};

/// A profitability ratio shown in the report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RatioKind {
    /// Net income over revenue.
    NetMargin,
    /// Net income over stockholders' equity.
    ReturnOnEquity,
    /// Net income over total assets.
    ReturnOnAssets,
    /// Free cash flow over revenue.
    FreeCashFlowToSales,
}

impl RatioKind {
    /// All ratios in report order.
    pub const ALL: [Self; 4] = [
        Self::NetMargin,
        Self::ReturnOnEquity,
        Self::ReturnOnAssets,
        Self::FreeCashFlowToSales,
    ];

    /// Report label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NetMargin => "Net margin",
            Self::ReturnOnEquity => "Return on equity",
            Self::ReturnOnAssets => "Return on assets",
            Self::FreeCashFlowToSales => "Free cash flow to sales",
        }
    }

    const fn operands(self) -> (Metric, Metric) {
        match self {
            Self::NetMargin => (Metric::NetIncome, Metric::TotalRevenue),
            Self::ReturnOnEquity => (Metric::NetIncome, Metric::StockholdersEquity),
            Self::ReturnOnAssets => (Metric::NetIncome, Metric::TotalAssets),
            Self::FreeCashFlowToSales => (Metric::FreeCashFlow, Metric::TotalRevenue),
        }
    }

    /// `(strong, weak)` cut-offs in percent.
    const fn cutoffs(self) -> (f64, f64) {
        match self {
            Self::NetMargin => (15.0, 5.0),
            Self::ReturnOnEquity => (15.0, 8.0),
            Self::ReturnOnAssets => (8.0, 3.0),
            Self::FreeCashFlowToSales => (10.0, 3.0),
        }
    }
}

/// Qualitative reading of a ratio.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Assessment {
    /// Above the strong cut-off.
    Strong,
    /// Between the cut-offs.
    Adequate,
    /// Below the weak cut-off.
    Weak,
}

impl Assessment {
    /// One-line comment for the report.
    #[must_use]
    pub const fn comment(self, kind: RatioKind) -> &'static str {
        match (kind, self) {
            (RatioKind::NetMargin, Self::Strong) => "high margin, pricing power",
            (RatioKind::NetMargin, Self::Adequate) => "moderate margin",
            (RatioKind::NetMargin, Self::Weak) => "thin margin",
            (RatioKind::ReturnOnEquity, Self::Strong) => "equity is used very profitably",
            (RatioKind::ReturnOnEquity, Self::Adequate) => "acceptable return on equity",
            (RatioKind::ReturnOnEquity, Self::Weak) => "weak return on equity",
            (RatioKind::ReturnOnAssets, Self::Strong) => "assets are used efficiently",
            (RatioKind::ReturnOnAssets, Self::Adequate) => "average asset efficiency",
            (RatioKind::ReturnOnAssets, Self::Weak) => "capital intensive or low returns",
            (RatioKind::FreeCashFlowToSales, Self::Strong) => "strong cash generation",
            (RatioKind::FreeCashFlowToSales, Self::Adequate) => "moderate cash generation",
            (RatioKind::FreeCashFlowToSales, Self::Weak) => "little cash left after investment",
        }
    }
}

/// A ratio for the latest period both operands share.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfitabilityRatio {
    /// Which ratio.
    pub kind: RatioKind,
    /// Period the ratio refers to.
    pub period: FiscalPeriod,
    /// Value in percent.
    pub percent: f64,
    /// Qualitative reading.
    pub assessment: Assessment,
}

impl ProfitabilityRatio {
    /// Comment for the report.
    #[must_use]
    pub const fn comment(&self) -> &'static str {
        self.assessment.comment(self.kind)
    }
}

/// Latest period where both series have a finite value and the denominator
/// is non-zero.
fn latest_common(num: &MetricSeries, den: &MetricSeries) -> Option<(FiscalPeriod, f64, f64)> {
    num.iter().rev().find_map(|(period, n)| {
        let d = den.get(period)?;
        (n.is_finite() && d.is_finite() && d != 0.0).then_some((*period, *n, d))
    })
}

/// Computes one ratio from a fact table.
pub fn ratio(facts: &FinancialFactTable, kind: RatioKind) -> AnalysisResult<ProfitabilityRatio> {
    let (num_metric, den_metric) = kind.operands();
    let statements = facts.statements();
    let num = statements.require(&num_metric, kind.label())?;
    let den = statements.require(&den_metric, kind.label())?;
    let (period, n, d) = latest_common(num, den).ok_or_else(|| AnalysisError::MissingMetric {
        metric: den_metric.clone(),
        scope: format!("{} common periods", kind.label()),
    })?;

    let percent = n / d * 100.0;
    let (strong, weak) = kind.cutoffs();
    let assessment = if percent > strong {
        Assessment::Strong
    } else if percent < weak {
        Assessment::Weak
    } else {
        Assessment::Adequate
    };
    Ok(ProfitabilityRatio {
        kind,
        period,
        percent,
        assessment,
    })
}

/// Computes every ratio, each failing independently.
#[must_use]
pub fn ratios(facts: &FinancialFactTable) -> Vec<(RatioKind, AnalysisResult<ProfitabilityRatio>)> {
    RatioKind::ALL
        .iter()
        .map(|kind| (*kind, ratio(facts, *kind)))
        .collect()
}
