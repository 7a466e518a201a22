//! Metric catalog: the ratios and trailing statistics a profile carries.
//!
//! Each metric knows how to derive itself from a filed record, the records
//! for the periods before it, and the price history up to the as-of date. It
//! also carries its polarity (whether high values are desirable). Polarity
//! lives here so detectors never have to guess it.

use crate::price_metrics::{self, TRADING_DAYS_5Y, TRADING_DAYS_PER_YEAR};
use ronda_traits::{FundamentalRecord, Polarity, PricePoint, Result, RondaError};
use serde::{Deserialize, Serialize};

/// Metric category classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricCategory {
    /// Price multiples
    Valuation,
    /// Returns on capital
    Profitability,
    /// Short-term solvency
    Liquidity,
    /// Balance sheet leverage
    Leverage,
    /// Change against the prior quarter or year
    Growth,
    /// Trailing price behavior
    Price,
}

impl MetricCategory {
    /// Get a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &str {
        match self {
            Self::Valuation => "Price relative to earnings, book, sales or cash",
            Self::Profitability => "Returns generated on equity and invested capital",
            Self::Liquidity => "Ability to meet short-term obligations",
            Self::Leverage => "Debt relative to equity and assets",
            Self::Growth => "Quarter-over-quarter and year-over-year change",
            Self::Price => "Returns, drawdowns and volatility of the share price",
        }
    }

    /// Every category in display order.
    pub const ALL: [Self; 6] = [
        Self::Valuation,
        Self::Profitability,
        Self::Liquidity,
        Self::Leverage,
        Self::Growth,
        Self::Price,
    ];
}

/// Inputs available to a metric formula.
#[derive(Debug, Clone, Copy)]
pub struct MetricInputs<'a> {
    /// The selected fundamental record.
    pub record: &'a FundamentalRecord,
    /// Close at or before the as-of date.
    pub price: Option<f64>,
    /// Market capitalization at the as-of date.
    pub market_cap: Option<f64>,
    /// Latest knowable version of the period one quarter earlier.
    pub prior_quarter: Option<&'a FundamentalRecord>,
    /// Latest knowable version of the period one year earlier.
    pub prior_year: Option<&'a FundamentalRecord>,
    /// Daily prices up to the as-of date, oldest first.
    pub history: &'a [PricePoint],
}

impl<'a> MetricInputs<'a> {
    /// Inputs for one record with no prior periods and no price history.
    pub const fn new(
        record: &'a FundamentalRecord,
        price: Option<f64>,
        market_cap: Option<f64>,
    ) -> Self {
        Self {
            record,
            price,
            market_cap,
            prior_quarter: None,
            prior_year: None,
            history: &[],
        }
    }

    /// Attach the prior-quarter and prior-year records.
    #[must_use]
    pub const fn with_priors(
        mut self,
        prior_quarter: Option<&'a FundamentalRecord>,
        prior_year: Option<&'a FundamentalRecord>,
    ) -> Self {
        self.prior_quarter = prior_quarter;
        self.prior_year = prior_year;
        self
    }

    /// Attach the price history.
    #[must_use]
    pub const fn with_history(mut self, history: &'a [PricePoint]) -> Self {
        self.history = history;
        self
    }

    /// Shorthand for a record line item.
    pub fn item(&self, name: &str) -> Option<f64> {
        self.record.item(name)
    }
}

/// A metric formula. Returns `None` when inputs are missing or degenerate.
pub type MetricFormula = fn(&MetricInputs<'_>) -> Option<f64>;

/// Definition of one screenable metric.
#[derive(Debug, Clone, Copy)]
pub struct MetricDef {
    /// Unique identifier for the metric
    pub name: &'static str,
    /// Category classification
    pub category: MetricCategory,
    /// Whether high or low values are desirable
    pub polarity: Polarity,
    /// Only strictly positive values enter segment distributions
    pub positive_only: bool,
    /// Human-readable description
    pub description: &'static str,
    /// How to compute the value
    pub formula: MetricFormula,
}

impl MetricDef {
    /// Evaluate the metric, discarding non-finite results.
    pub fn compute(&self, inputs: &MetricInputs<'_>) -> Option<f64> {
        (self.formula)(inputs).filter(|v| v.is_finite())
    }

    /// Whether `value` may enter a segment distribution for this metric.
    pub fn admits(&self, value: f64) -> bool {
        value.is_finite() && (!self.positive_only || value > 0.0)
    }
}

/// `numerator / denominator`, `None` on a zero or missing denominator.
pub fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => Some(n / d),
        _ => None,
    }
}

/// `(current - previous) / previous`, `None` when `previous` is zero.
pub fn growth(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    let previous = previous?;
    ratio(current.map(|c| c - previous), Some(previous))
}

/// `(current - previous) / |previous|`, `None` when `previous` is zero.
///
/// With `same_sign`, also `None` unless both values share a strict sign.
pub fn change(current: Option<f64>, previous: Option<f64>, same_sign: bool) -> Option<f64> {
    let (current, previous) = (current?, previous?);
    if same_sign && current * previous <= 0.0 {
        return None;
    }
    ratio(Some(current - previous), Some(previous.abs()))
}

fn pe_ratio(i: &MetricInputs<'_>) -> Option<f64> {
    ratio(i.price, i.item("epsdil"))
}

fn pb_ratio(i: &MetricInputs<'_>) -> Option<f64> {
    ratio(i.price, i.item("bvps"))
}

fn ps_ratio(i: &MetricInputs<'_>) -> Option<f64> {
    ratio(i.price, i.item("sps"))
}

fn pc_ratio(i: &MetricInputs<'_>) -> Option<f64> {
    let cash_per_share = ratio(i.item("cashneq"), i.item("sharesbas"));
    ratio(i.price, cash_per_share)
}

fn ev_ebitda_ratio(i: &MetricInputs<'_>) -> Option<f64> {
    // Rebuild enterprise value at the as-of price when possible.
    let ev = match (i.market_cap, i.item("debt"), i.item("cashneq")) {
        (Some(mc), Some(debt), Some(cash)) => Some(mc + debt - cash),
        _ => i.item("ev"),
    };
    ratio(ev, i.item("ebitda"))
}

fn roe(i: &MetricInputs<'_>) -> Option<f64> {
    ratio(i.item("netinccmn"), i.item("equity"))
}

fn roic(i: &MetricInputs<'_>) -> Option<f64> {
    let tax_rate = match (i.item("taxexp"), i.item("ebt")) {
        (Some(tax), Some(ebt)) if ebt > 0.0 => tax / ebt,
        _ => 0.0,
    };
    let nopat = i.item("ebit").map(|ebit| ebit * (1.0 - tax_rate));
    let invested = match (i.item("debt"), i.item("equity"), i.item("cashneq")) {
        (Some(debt), Some(equity), Some(cash)) => Some(debt + equity - cash),
        _ => None,
    };
    ratio(nopat, invested)
}

fn current_ratio(i: &MetricInputs<'_>) -> Option<f64> {
    ratio(i.item("assetsc"), i.item("liabilitiesc"))
}

fn interest_coverage(i: &MetricInputs<'_>) -> Option<f64> {
    ratio(i.item("ebit"), i.item("intexp"))
}

fn debt_to_equity(i: &MetricInputs<'_>) -> Option<f64> {
    ratio(i.item("debt"), i.item("equity"))
}

fn debt_to_assets(i: &MetricInputs<'_>) -> Option<f64> {
    ratio(i.item("debt"), i.item("assets"))
}

fn item_growth(i: &MetricInputs<'_>, prior: Option<&FundamentalRecord>, item: &str) -> Option<f64> {
    growth(i.item(item), prior?.item(item))
}

fn eps_growth_qoq(i: &MetricInputs<'_>) -> Option<f64> {
    change(i.item("epsdil"), i.prior_quarter?.item("epsdil"), false)
}

fn eps_growth_yoy(i: &MetricInputs<'_>) -> Option<f64> {
    change(i.item("epsdil"), i.prior_year?.item("epsdil"), false)
}

fn revenue_growth_qoq(i: &MetricInputs<'_>) -> Option<f64> {
    item_growth(i, i.prior_quarter, "revenue")
}

fn revenue_growth_yoy(i: &MetricInputs<'_>) -> Option<f64> {
    item_growth(i, i.prior_year, "revenue")
}

fn marketcap_growth_qoq(i: &MetricInputs<'_>) -> Option<f64> {
    item_growth(i, i.prior_quarter, "marketcap")
}

fn marketcap_growth_yoy(i: &MetricInputs<'_>) -> Option<f64> {
    item_growth(i, i.prior_year, "marketcap")
}

fn assets_growth_qoq(i: &MetricInputs<'_>) -> Option<f64> {
    item_growth(i, i.prior_quarter, "assets")
}

fn assets_growth_yoy(i: &MetricInputs<'_>) -> Option<f64> {
    item_growth(i, i.prior_year, "assets")
}

fn roe_growth_qoq(i: &MetricInputs<'_>) -> Option<f64> {
    change(roe(i), roe(&MetricInputs::new(i.prior_quarter?, None, None)), true)
}

fn roe_growth_yoy(i: &MetricInputs<'_>) -> Option<f64> {
    change(roe(i), roe(&MetricInputs::new(i.prior_year?, None, None)), true)
}

fn roic_growth_qoq(i: &MetricInputs<'_>) -> Option<f64> {
    change(roic(i), roic(&MetricInputs::new(i.prior_quarter?, None, None)), true)
}

fn roic_growth_yoy(i: &MetricInputs<'_>) -> Option<f64> {
    change(roic(i), roic(&MetricInputs::new(i.prior_year?, None, None)), true)
}

fn return_1y(i: &MetricInputs<'_>) -> Option<f64> {
    price_metrics::trailing_return(i.history, TRADING_DAYS_PER_YEAR)
}

fn return_5y_or_longest(i: &MetricInputs<'_>) -> Option<f64> {
    price_metrics::return_5y_or_longest(i.history)
}

fn max_drawdown_1y(i: &MetricInputs<'_>) -> Option<f64> {
    price_metrics::max_drawdown(i.history, TRADING_DAYS_PER_YEAR)
}

fn max_drawdown_5y(i: &MetricInputs<'_>) -> Option<f64> {
    price_metrics::max_drawdown(i.history, TRADING_DAYS_5Y)
}

fn volatility_1y(i: &MetricInputs<'_>) -> Option<f64> {
    price_metrics::volatility_1y(i.history)
}

fn pct_from_high_5y(i: &MetricInputs<'_>) -> Option<f64> {
    price_metrics::pct_from_high_5y(i.history)
}

fn pct_from_low_5y(i: &MetricInputs<'_>) -> Option<f64> {
    price_metrics::pct_from_low_5y(i.history)
}

fn pct_from_sma_200(i: &MetricInputs<'_>) -> Option<f64> {
    price_metrics::pct_from_sma_200(i.history)
}

const fn growth_def(
    name: &'static str,
    description: &'static str,
    formula: MetricFormula,
) -> MetricDef {
    MetricDef {
        name,
        category: MetricCategory::Growth,
        polarity: Polarity::HigherIsBetter,
        positive_only: false,
        description,
        formula,
    }
}

const fn price_def(
    name: &'static str,
    polarity: Polarity,
    description: &'static str,
    formula: MetricFormula,
) -> MetricDef {
    MetricDef {
        name,
        category: MetricCategory::Price,
        polarity,
        positive_only: false,
        description,
        formula,
    }
}

/// The set of metrics profiles are built with.
#[derive(Debug, Clone)]
pub struct MetricCatalog {
    metrics: Vec<MetricDef>,
}

impl MetricCatalog {
    /// An empty catalog.
    pub const fn empty() -> Self {
        Self {
            metrics: Vec::new(),
        }
    }

    /// Every built-in metric: the fundamental ratios, their growth and the
    /// trailing price statistics.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut catalog = Self::fundamentals();
        catalog.metrics.extend(Self::growth_metrics());
        catalog.metrics.extend(Self::price_metrics());
        catalog
    }

    /// The eleven valuation, profitability, liquidity and leverage ratios.
    ///
    /// Only strictly positive values of these enter segment distributions; a
    /// negative P/E or ROE describes a loss, not a cheap or poor company.
    #[must_use]
    pub fn fundamentals() -> Self {
        Self {
            metrics: vec![
                // Valuation (lower is better)
                MetricDef {
                    name: "pe_ratio",
                    category: MetricCategory::Valuation,
                    polarity: Polarity::LowerIsBetter,
                    positive_only: true,
                    description: "Price over diluted EPS",
                    formula: pe_ratio,
                },
                MetricDef {
                    name: "pb_ratio",
                    category: MetricCategory::Valuation,
                    polarity: Polarity::LowerIsBetter,
                    positive_only: true,
                    description: "Price over book value per share",
                    formula: pb_ratio,
                },
                MetricDef {
                    name: "ps_ratio",
                    category: MetricCategory::Valuation,
                    polarity: Polarity::LowerIsBetter,
                    positive_only: true,
                    description: "Price over sales per share",
                    formula: ps_ratio,
                },
                MetricDef {
                    name: "pc_ratio",
                    category: MetricCategory::Valuation,
                    polarity: Polarity::LowerIsBetter,
                    positive_only: true,
                    description: "Price over cash per share",
                    formula: pc_ratio,
                },
                MetricDef {
                    name: "ev_ebitda_ratio",
                    category: MetricCategory::Valuation,
                    polarity: Polarity::LowerIsBetter,
                    positive_only: true,
                    description: "Enterprise value over EBITDA",
                    formula: ev_ebitda_ratio,
                },
                // Profitability (higher is better)
                MetricDef {
                    name: "roe_calculated",
                    category: MetricCategory::Profitability,
                    polarity: Polarity::HigherIsBetter,
                    positive_only: true,
                    description: "Net income to common over shareholder equity",
                    formula: roe,
                },
                MetricDef {
                    name: "roic_calculated",
                    category: MetricCategory::Profitability,
                    polarity: Polarity::HigherIsBetter,
                    positive_only: true,
                    description: "After-tax EBIT over debt plus equity less cash",
                    formula: roic,
                },
                // Liquidity (higher is better)
                MetricDef {
                    name: "current_ratio",
                    category: MetricCategory::Liquidity,
                    polarity: Polarity::HigherIsBetter,
                    positive_only: true,
                    description: "Current assets over current liabilities",
                    formula: current_ratio,
                },
                MetricDef {
                    name: "interest_coverage",
                    category: MetricCategory::Liquidity,
                    polarity: Polarity::HigherIsBetter,
                    positive_only: true,
                    description: "EBIT over interest expense",
                    formula: interest_coverage,
                },
                // Leverage (lower is better)
                MetricDef {
                    name: "debt_to_equity",
                    category: MetricCategory::Leverage,
                    polarity: Polarity::LowerIsBetter,
                    positive_only: true,
                    description: "Total debt over shareholder equity",
                    formula: debt_to_equity,
                },
                MetricDef {
                    name: "debt_to_assets",
                    category: MetricCategory::Leverage,
                    polarity: Polarity::LowerIsBetter,
                    positive_only: true,
                    description: "Total debt over total assets",
                    formula: debt_to_assets,
                },
            ],
        }
    }

    fn growth_metrics() -> Vec<MetricDef> {
        vec![
            growth_def("eps_growth_qoq", "Diluted EPS change on the prior quarter", eps_growth_qoq),
            growth_def("eps_growth_yoy", "Diluted EPS change on the prior year", eps_growth_yoy),
            growth_def(
                "revenue_growth_qoq",
                "Revenue growth on the prior quarter",
                revenue_growth_qoq,
            ),
            growth_def(
                "revenue_growth_yoy",
                "Revenue growth on the prior year",
                revenue_growth_yoy,
            ),
            growth_def(
                "marketcap_growth_qoq",
                "Reported market cap growth on the prior quarter",
                marketcap_growth_qoq,
            ),
            growth_def(
                "marketcap_growth_yoy",
                "Reported market cap growth on the prior year",
                marketcap_growth_yoy,
            ),
            growth_def(
                "assets_growth_qoq",
                "Total assets growth on the prior quarter",
                assets_growth_qoq,
            ),
            growth_def(
                "assets_growth_yoy",
                "Total assets growth on the prior year",
                assets_growth_yoy,
            ),
            growth_def(
                "roe_calculated_growth_qoq",
                "ROE change on the prior quarter, undefined across zero",
                roe_growth_qoq,
            ),
            growth_def(
                "roe_calculated_growth_yoy",
                "ROE change on the prior year, undefined across zero",
                roe_growth_yoy,
            ),
            growth_def(
                "roic_calculated_growth_qoq",
                "ROIC change on the prior quarter, undefined across zero",
                roic_growth_qoq,
            ),
            growth_def(
                "roic_calculated_growth_yoy",
                "ROIC change on the prior year, undefined across zero",
                roic_growth_yoy,
            ),
        ]
    }

    fn price_metrics() -> Vec<MetricDef> {
        use Polarity::{HigherIsBetter, LowerIsBetter};
        vec![
            price_def("return_1y", HigherIsBetter, "Return over 252 trading days", return_1y),
            price_def(
                "return_5y_or_longest",
                HigherIsBetter,
                "Return over five years, or the whole history if shorter",
                return_5y_or_longest,
            ),
            price_def(
                "max_drawdown_1y",
                HigherIsBetter,
                "Worst fall from a running peak over one year",
                max_drawdown_1y,
            ),
            price_def(
                "max_drawdown_5y",
                HigherIsBetter,
                "Worst fall from a running peak over five years",
                max_drawdown_5y,
            ),
            price_def(
                "volatility_1y",
                LowerIsBetter,
                "Annualized standard deviation of daily returns",
                volatility_1y,
            ),
            price_def(
                "pct_from_high_5y",
                HigherIsBetter,
                "Distance below the five-year high",
                pct_from_high_5y,
            ),
            price_def(
                "pct_from_low_5y",
                HigherIsBetter,
                "Distance above the five-year low",
                pct_from_low_5y,
            ),
            price_def(
                "pct_from_sma_200",
                HigherIsBetter,
                "Distance from the 200-day moving average",
                pct_from_sma_200,
            ),
        ]
    }

    /// Add a metric.
    ///
    /// # Errors
    ///
    /// [`RondaError::DuplicateRegistration`] if the name is taken.
    pub fn register(&mut self, def: MetricDef) -> Result<()> {
        if self.get(def.name).is_some() {
            return Err(RondaError::DuplicateRegistration(def.name.to_string()));
        }
        self.metrics.push(def);
        Ok(())
    }

    /// Look up a metric by name.
    pub fn get(&self, name: &str) -> Option<&MetricDef> {
        self.metrics.iter().find(|m| m.name == name)
    }

    /// Look up a metric, failing with [`RondaError::UnknownMetric`].
    pub fn require(&self, name: &str) -> Result<&MetricDef> {
        self.get(name)
            .ok_or_else(|| RondaError::UnknownMetric(name.to_string()))
    }

    /// All metrics in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &MetricDef> {
        self.metrics.iter()
    }

    /// Metric names in catalog order.
    pub fn names(&self) -> Vec<&'static str> {
        self.metrics.iter().map(|m| m.name).collect()
    }

    /// Metrics in one category.
    pub fn by_category(&self, category: MetricCategory) -> Vec<&MetricDef> {
        self.metrics
            .iter()
            .filter(|m| m.category == category)
            .collect()
    }

    /// Number of metrics.
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

impl Default for MetricCatalog {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::Duration;
    use ronda_traits::{Date, Dimension};
    use std::collections::BTreeMap;

    fn record_at(period: Date, items: &[(&str, f64)]) -> FundamentalRecord {
        let items: BTreeMap<String, f64> =
            items.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        FundamentalRecord::new("TEST", period, period, period, Dimension::Mrq, items).unwrap()
    }

    fn record(items: &[(&str, f64)]) -> FundamentalRecord {
        record_at(Date::from_ymd_opt(2020, 3, 31).unwrap(), items)
    }

    fn compute(name: &str, rec: &FundamentalRecord, price: Option<f64>) -> Option<f64> {
        let catalog = MetricCatalog::with_defaults();
        let inputs = MetricInputs::new(rec, price, None);
        catalog.get(name).unwrap().compute(&inputs)
    }

    fn compute_with(name: &str, inputs: &MetricInputs<'_>) -> Option<f64> {
        MetricCatalog::with_defaults().require(name).unwrap().compute(inputs)
    }

    #[test]
    fn test_default_catalog() {
        let catalog = MetricCatalog::with_defaults();
        assert_eq!(catalog.len(), 31);
        assert_eq!(MetricCatalog::fundamentals().len(), 11);
        assert_eq!(catalog.by_category(MetricCategory::Valuation).len(), 5);
        assert_eq!(catalog.by_category(MetricCategory::Growth).len(), 12);
        assert_eq!(catalog.by_category(MetricCategory::Price).len(), 8);
        assert_eq!(
            catalog.get("pe_ratio").unwrap().polarity,
            Polarity::LowerIsBetter
        );
        assert_eq!(
            catalog.get("roe_calculated").unwrap().polarity,
            Polarity::HigherIsBetter
        );
        assert_eq!(
            catalog.get("volatility_1y").unwrap().polarity,
            Polarity::LowerIsBetter
        );
        assert!(matches!(
            catalog.require("nope"),
            Err(RondaError::UnknownMetric(_))
        ));
    }

    #[test]
    fn test_duplicate_metric_rejected() {
        let mut catalog = MetricCatalog::with_defaults();
        let def = *catalog.get("pe_ratio").unwrap();
        assert!(matches!(
            catalog.register(def),
            Err(RondaError::DuplicateRegistration(_))
        ));
    }

    #[test]
    fn test_valuation_formulas() {
        let rec = record(&[
            ("epsdil", 5.0),
            ("bvps", 20.0),
            ("cashneq", 1000.0),
            ("sharesbas", 100.0),
        ]);
        assert_relative_eq!(compute("pe_ratio", &rec, Some(50.0)).unwrap(), 10.0);
        assert_relative_eq!(compute("pb_ratio", &rec, Some(50.0)).unwrap(), 2.5);
        assert_relative_eq!(compute("pc_ratio", &rec, Some(50.0)).unwrap(), 5.0);
        assert_eq!(compute("pe_ratio", &rec, None), None);
        assert_eq!(compute("ps_ratio", &rec, Some(50.0)), None);
    }

    #[test]
    fn test_zero_denominator_is_missing() {
        let rec = record(&[("debt", 10.0), ("equity", 0.0)]);
        assert_eq!(compute("debt_to_equity", &rec, None), None);
    }

    #[test]
    fn test_roic() {
        let rec = record(&[
            ("ebit", 100.0),
            ("taxexp", 20.0),
            ("ebt", 80.0),
            ("debt", 300.0),
            ("equity", 500.0),
            ("cashneq", 100.0),
        ]);
        // 100 * (1 - 0.25) / 700
        assert_relative_eq!(compute("roic_calculated", &rec, None).unwrap(), 75.0 / 700.0);
    }

    #[test]
    fn test_ev_ebitda_prefers_as_of_market_cap() {
        let rec = record(&[("ev", 999.0), ("ebitda", 10.0), ("debt", 50.0), ("cashneq", 20.0)]);
        let catalog = MetricCatalog::with_defaults();
        let def = catalog.get("ev_ebitda_ratio").unwrap();

        let with_cap = MetricInputs::new(&rec, None, Some(170.0));
        assert_relative_eq!(def.compute(&with_cap).unwrap(), 20.0);

        let without_cap = MetricInputs::new(&rec, None, None);
        assert_relative_eq!(def.compute(&without_cap).unwrap(), 99.9);
    }

    #[test]
    fn test_positive_only_admission() {
        let catalog = MetricCatalog::with_defaults();
        for def in MetricCatalog::fundamentals().iter() {
            assert!(def.positive_only, "{} should be positive-only", def.name);
        }

        let pe = catalog.get("pe_ratio").unwrap();
        assert!(!pe.admits(-5.0));
        assert!(!pe.admits(0.0));
        assert!(pe.admits(12.0));

        let roe = catalog.get("roe_calculated").unwrap();
        assert!(!roe.admits(-0.2));
        assert!(roe.admits(0.15));
        assert!(!roe.admits(f64::NAN));

        let growth = catalog.get("eps_growth_yoy").unwrap();
        assert!(growth.admits(-0.4));
    }

    #[test]
    fn test_growth_against_prior_periods() {
        let cur = record(&[("epsdil", 1.5), ("revenue", 120.0), ("assets", 90.0)]);
        let quarter = record_at(
            Date::from_ymd_opt(2019, 12, 31).unwrap(),
            &[("epsdil", -1.0), ("revenue", 100.0), ("assets", 0.0)],
        );
        let year = record_at(
            Date::from_ymd_opt(2019, 3, 31).unwrap(),
            &[("epsdil", 3.0), ("revenue", 80.0)],
        );
        let inputs = MetricInputs::new(&cur, None, None).with_priors(Some(&quarter), Some(&year));

        // EPS divides by the absolute prior value.
        assert_relative_eq!(compute_with("eps_growth_qoq", &inputs).unwrap(), 2.5);
        assert_relative_eq!(compute_with("eps_growth_yoy", &inputs).unwrap(), -0.5);
        assert_relative_eq!(compute_with("revenue_growth_qoq", &inputs).unwrap(), 0.2);
        assert_relative_eq!(compute_with("revenue_growth_yoy", &inputs).unwrap(), 0.5);
        // Zero prior value and missing line items give nothing.
        assert_eq!(compute_with("assets_growth_qoq", &inputs), None);
        assert_eq!(compute_with("assets_growth_yoy", &inputs), None);
        assert_eq!(compute_with("marketcap_growth_qoq", &inputs), None);

        let alone = MetricInputs::new(&cur, None, None);
        assert_eq!(compute_with("revenue_growth_qoq", &alone), None);
    }

    #[test]
    fn test_ratio_growth_undefined_across_zero() {
        let cur = record(&[("netinccmn", 20.0), ("equity", 100.0)]);
        let gain = record(&[("netinccmn", 10.0), ("equity", 100.0)]);
        let loss = record(&[("netinccmn", -10.0), ("equity", 100.0)]);

        let inputs = MetricInputs::new(&cur, None, None).with_priors(Some(&gain), Some(&loss));
        assert_relative_eq!(compute_with("roe_calculated_growth_qoq", &inputs).unwrap(), 1.0);
        assert_eq!(compute_with("roe_calculated_growth_yoy", &inputs), None);
        assert_relative_eq!(change(Some(-2.0), Some(-4.0), true).unwrap(), 0.5);
    }

    #[test]
    fn test_price_metrics_read_history() {
        let rec = record(&[]);
        let origin = Date::from_ymd_opt(2019, 1, 1).unwrap();
        let history: Vec<PricePoint> = (0..=252)
            .map(|i| PricePoint::from_close(origin + Duration::days(i), 100.0 + i as f64))
            .collect();
        let inputs = MetricInputs::new(&rec, Some(352.0), None).with_history(&history);

        assert_relative_eq!(
            compute_with("return_1y", &inputs).unwrap(),
            2.52,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            compute_with("return_5y_or_longest", &inputs).unwrap(),
            2.52,
            epsilon = 1e-12
        );
        assert_relative_eq!(compute_with("max_drawdown_1y", &inputs).unwrap(), 0.0);
        assert_relative_eq!(compute_with("pct_from_high_5y", &inputs).unwrap(), 0.0);
        assert!(compute_with("pct_from_sma_200", &inputs).unwrap() > 0.0);

        let bare = MetricInputs::new(&rec, Some(352.0), None);
        assert_eq!(compute_with("return_1y", &bare), None);
        assert_eq!(compute_with("volatility_1y", &bare), None);
    }
}
