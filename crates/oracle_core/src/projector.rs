//! Financial projector: baseline statement + deltas → one projected statement.
//!
//! Pure and deterministic; performs no I/O. The model holds the baseline
//! gross margin constant, keeps D&A fixed and scales CapEx and working
//! capital with revenue:
//!
//! ```text
//! revenue  = revenue₀ × (1 + g)
//! opex     = opex₀ × (1 + δ)
//! cogs     = revenue × (1 − gross_margin₀)
//! ebitda   = revenue − cogs − opex
//! ebit     = ebitda − D&A₀
//! fcf      = ebit × (1 − τ) + D&A₀ + Δwc₀ × s + capex₀ × s,   s = revenue / revenue₀
//! rate     = base_rate + Δr
//! ```

use crate::types::{FinancialReport, ProjectionError, ScenarioDeltas};

/// Decimal deltas for one projection (already sampled, if stochastic).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProjectionInputs {
    /// Revenue growth as a decimal (`0.02` = +2%).
    pub revenue_growth: f64,
    /// Relative OpEx change as a decimal.
    pub opex_delta: f64,
    /// Additive discount-rate change as a decimal.
    pub discount_rate_delta: f64,
}

impl ProjectionInputs {
    /// Build inputs from basis points.
    pub fn from_bps(revenue_growth_bps: i32, opex_bps: i32, discount_rate_bps: i32) -> Self {
        Self::from(ScenarioDeltas::new(revenue_growth_bps, opex_bps, discount_rate_bps))
    }
}

impl From<ScenarioDeltas> for ProjectionInputs {
    fn from(deltas: ScenarioDeltas) -> Self {
        Self {
            revenue_growth: deltas.revenue_growth(),
            opex_delta: deltas.opex_delta(),
            discount_rate_delta: deltas.discount_rate_delta(),
        }
    }
}

/// Fixed model assumptions not carried by the report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionAssumptions {
    /// Base discount rate (WACC) before the scenario delta.
    pub base_discount_rate: f64,
    /// Tax rate used when the report has no `TaxRate` KPI.
    pub default_tax_rate: f64,
}

impl Default for ProjectionAssumptions {
    fn default() -> Self {
        Self {
            base_discount_rate: 0.08,
            default_tax_rate: 0.25,
        }
    }
}

/// One projected statement instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedStatement {
    /// Projected revenue.
    pub revenue: f64,
    /// Projected cost of goods sold.
    pub cost_of_goods_sold: f64,
    /// Projected gross profit.
    pub gross_profit: f64,
    /// Projected operating expenses.
    pub opex: f64,
    /// Projected EBITDA.
    pub ebitda: f64,
    /// Depreciation and amortisation (held at baseline).
    pub depreciation_and_amortization: f64,
    /// Projected EBIT.
    pub ebit: f64,
    /// Taxes on positive EBIT.
    pub taxes: f64,
    /// Projected net income.
    pub net_income: f64,
    /// Scaled capital expenditures (signed).
    pub capex: f64,
    /// Scaled working-capital cash effect (signed).
    pub change_in_working_capital: f64,
    /// First-year free cash flow.
    pub free_cash_flow: f64,
    /// Tax rate applied.
    pub tax_rate: f64,
    /// Discount rate to be used downstream.
    pub discount_rate: f64,
}

/// Free cash flow from its components.
///
/// `FCF = EBIT × (1 − τ) + D&A + Δwc + capex`, where `Δwc` and `capex`
/// follow the signed cash-flow convention (outflows negative).
#[inline]
pub fn free_cash_flow(ebit: f64, tax_rate: f64, dep_amort: f64, change_wc: f64, capex: f64) -> f64 {
    ebit * (1.0 - tax_rate) + dep_amort + change_wc + capex
}

/// Project one statement from `baseline` under `inputs`.
///
/// # Errors
///
/// Returns [`ProjectionError`] if the baseline revenue is not positive, a
/// required line item is not finite, or the tax rate is outside [0, 1).
pub fn project(
    baseline: &FinancialReport,
    inputs: &ProjectionInputs,
    assumptions: &ProjectionAssumptions,
) -> Result<ProjectedStatement, ProjectionError> {
    check_baseline(baseline)?;

    let is = &baseline.income_statement;
    let cf = &baseline.cash_flow;
    let tax_rate = baseline.tax_rate().unwrap_or(assumptions.default_tax_rate);
    if !(0.0..1.0).contains(&tax_rate) {
        return Err(ProjectionError::InvalidTaxRate(tax_rate));
    }

    let revenue = is.revenue * (1.0 + inputs.revenue_growth);
    let opex = is.opex * (1.0 + inputs.opex_delta);
    let cost_of_goods_sold = revenue * (1.0 - baseline.gross_margin());
    let gross_profit = revenue - cost_of_goods_sold;
    let ebitda = gross_profit - opex;
    let dep_amort = is.depreciation_and_amortization;
    let ebit = ebitda - dep_amort;
    let taxes = if ebit > 0.0 { ebit * tax_rate } else { 0.0 };
    let net_income = ebit - is.interest_expense - taxes;

    let scale = revenue / is.revenue;
    let capex = cf.capex * scale;
    let change_in_working_capital = cf.change_in_working_capital * scale;

    Ok(ProjectedStatement {
        revenue,
        cost_of_goods_sold,
        gross_profit,
        opex,
        ebitda,
        depreciation_and_amortization: dep_amort,
        ebit,
        taxes,
        net_income,
        capex,
        change_in_working_capital,
        free_cash_flow: free_cash_flow(ebit, tax_rate, dep_amort, change_in_working_capital, capex),
        tax_rate,
        discount_rate: assumptions.base_discount_rate + inputs.discount_rate_delta,
    })
}

fn check_baseline(baseline: &FinancialReport) -> Result<(), ProjectionError> {
    let is = &baseline.income_statement;
    let cf = &baseline.cash_flow;
    let required = [
        ("Revenue", is.revenue),
        ("GrossProfit", is.gross_profit),
        ("OpEx", is.opex),
        ("DepreciationAndAmortization", is.depreciation_and_amortization),
        ("InterestExpense", is.interest_expense),
        ("ChangeInWorkingCapital", cf.change_in_working_capital),
        ("CapEx", cf.capex),
    ];
    if let Some((name, _)) = required.iter().find(|(_, v)| !v.is_finite()) {
        return Err(ProjectionError::NonFiniteLineItem(name));
    }
    if is.revenue <= 0.0 {
        return Err(ProjectionError::NonPositiveRevenue(is.revenue));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_free_cash_flow_formula() {
        // EBIT=100, t=0.25 -> NOPAT=75; +10 D&A, -5 WC, -20 CapEx
        assert_relative_eq!(free_cash_flow(100.0, 0.25, 10.0, -5.0, -20.0), 60.0);
    }

    #[test]
    fn test_zero_deltas_reproduce_baseline() {
        let report = FinancialReport::sample();
        let p = project(&report, &ProjectionInputs::default(), &ProjectionAssumptions::default()).unwrap();

        assert_relative_eq!(p.revenue, 1_000_000.0);
        assert_relative_eq!(p.ebitda, 300_000.0, max_relative = 1e-12);
        assert_relative_eq!(p.ebit, 250_000.0, max_relative = 1e-12);
        // 250k × 0.75 + 50k − 10k − 60k
        assert_relative_eq!(p.free_cash_flow, 167_500.0, max_relative = 1e-12);
        assert_relative_eq!(p.discount_rate, 0.08);
    }

    #[test]
    fn test_deltas_are_applied() {
        let report = FinancialReport::sample();
        let inputs = ProjectionInputs::from_bps(1_000, -1_000, 200);
        let p = project(&report, &inputs, &ProjectionAssumptions::default()).unwrap();

        assert_relative_eq!(p.revenue, 1_100_000.0, max_relative = 1e-12);
        assert_relative_eq!(p.opex, 270_000.0, max_relative = 1e-12);
        assert_relative_eq!(p.gross_profit, 660_000.0, max_relative = 1e-12);
        assert_relative_eq!(p.capex, -66_000.0, max_relative = 1e-12);
        assert_relative_eq!(p.discount_rate, 0.10, max_relative = 1e-12);
    }

    #[test]
    fn test_no_tax_on_losses() {
        let mut report = FinancialReport::sample();
        report.income_statement.opex = 900_000.0;
        let p = project(&report, &ProjectionInputs::default(), &ProjectionAssumptions::default()).unwrap();
        assert!(p.ebit < 0.0);
        assert_eq!(p.taxes, 0.0);
    }

    #[test]
    fn test_zero_revenue_is_rejected() {
        let mut report = FinancialReport::sample();
        report.income_statement.revenue = 0.0;
        let err = project(&report, &ProjectionInputs::default(), &ProjectionAssumptions::default()).unwrap_err();
        assert!(err.to_string().contains("Base revenue must be positive"));
    }

    #[test]
    fn test_non_finite_line_item_is_rejected() {
        let mut report = FinancialReport::sample();
        report.cash_flow.capex = f64::NAN;
        let err = project(&report, &ProjectionInputs::default(), &ProjectionAssumptions::default()).unwrap_err();
        assert_eq!(err, ProjectionError::NonFiniteLineItem("CapEx"));
    }

    #[test]
    fn test_tax_rate_kpi_out_of_range() {
        let mut report = FinancialReport::sample();
        report.kpis.insert(FinancialReport::TAX_RATE_KPI.to_string(), 1.5);
        let err = project(&report, &ProjectionInputs::default(), &ProjectionAssumptions::default()).unwrap_err();
        assert_eq!(err, ProjectionError::InvalidTaxRate(1.5));
    }
}
