//! Baseline financial report types.
//!
//! Field names on the wire follow the extraction contract (`Revenue`, `OpEx`,
//! `EBITDA`, ...). Line items the projector depends on are required; the
//! remaining items default to zero when absent so that partially extracted
//! reports can still be registered.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Identifier of a registered baseline report.
pub type ReportId = Uuid;

/// Income statement line items for one fiscal period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeStatement {
    /// Total revenue.
    #[serde(rename = "Revenue")]
    pub revenue: f64,
    /// Cost of goods sold.
    #[serde(rename = "CostOfGoodsSold", default)]
    pub cost_of_goods_sold: f64,
    /// Gross profit (revenue less COGS).
    #[serde(rename = "GrossProfit")]
    pub gross_profit: f64,
    /// Operating expenses.
    #[serde(rename = "OpEx")]
    pub opex: f64,
    /// Earnings before interest, taxes, depreciation and amortisation.
    #[serde(rename = "EBITDA", default)]
    pub ebitda: f64,
    /// Depreciation and amortisation.
    #[serde(rename = "DepreciationAndAmortization")]
    pub depreciation_and_amortization: f64,
    /// Earnings before interest and taxes.
    #[serde(rename = "EBIT", default)]
    pub ebit: f64,
    /// Interest expense.
    #[serde(rename = "InterestExpense")]
    pub interest_expense: f64,
    /// Income taxes.
    #[serde(rename = "Taxes", default)]
    pub taxes: f64,
    /// Net income.
    #[serde(rename = "NetIncome", default)]
    pub net_income: f64,
}

/// Balance sheet expressed as named line-item maps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheet {
    /// Asset line items, optionally including `TotalAssets`.
    #[serde(rename = "Assets", default)]
    pub assets: BTreeMap<String, f64>,
    /// Liability line items, optionally including `TotalLiabilities`.
    #[serde(rename = "Liabilities", default)]
    pub liabilities: BTreeMap<String, f64>,
    /// Equity line items, optionally including `TotalEquity`.
    #[serde(rename = "Equity", default)]
    pub equity: BTreeMap<String, f64>,
    /// Cash and equivalents.
    #[serde(rename = "Cash", default, skip_serializing_if = "Option::is_none")]
    pub cash: Option<f64>,
    /// Short-term debt.
    #[serde(rename = "ShortTermDebt", default, skip_serializing_if = "Option::is_none")]
    pub short_term_debt: Option<f64>,
    /// Long-term debt.
    #[serde(rename = "LongTermDebt", default, skip_serializing_if = "Option::is_none")]
    pub long_term_debt: Option<f64>,
}

impl BalanceSheet {
    /// Total assets: the `TotalAssets` item if present, otherwise the sum of the other items.
    pub fn total_assets(&self) -> f64 {
        total_or_sum(&self.assets, "TotalAssets")
    }

    /// Total liabilities: the `TotalLiabilities` item if present, otherwise the sum.
    pub fn total_liabilities(&self) -> f64 {
        total_or_sum(&self.liabilities, "TotalLiabilities")
    }

    /// Total equity: the `TotalEquity` item if present, otherwise the sum.
    pub fn total_equity(&self) -> f64 {
        total_or_sum(&self.equity, "TotalEquity")
    }
}

fn total_or_sum(items: &BTreeMap<String, f64>, total_key: &str) -> f64 {
    items.get(total_key).copied().unwrap_or_else(|| {
        items
            .iter()
            .filter(|(k, _)| k.as_str() != total_key)
            .map(|(_, v)| *v)
            .sum()
    })
}

/// Cash flow statement.
///
/// Signed cash-flow convention: outflows are negative (`CapEx = -20.0`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlow {
    /// Net income carried from the income statement.
    #[serde(rename = "NetIncome", default)]
    pub net_income: f64,
    /// Depreciation add-back.
    #[serde(rename = "Depreciation", default)]
    pub depreciation: f64,
    /// Cash effect of working-capital changes.
    #[serde(rename = "ChangeInWorkingCapital")]
    pub change_in_working_capital: f64,
    /// Cash from operating activities.
    #[serde(rename = "CashFromOperations", default)]
    pub cash_from_operations: f64,
    /// Capital expenditures (usually negative).
    #[serde(rename = "CapEx")]
    pub capex: f64,
    /// Cash from investing activities.
    #[serde(rename = "CashFromInvesting", default)]
    pub cash_from_investing: f64,
    /// Cash from financing activities.
    #[serde(rename = "CashFromFinancing", default)]
    pub cash_from_financing: f64,
    /// Net change in cash over the period.
    #[serde(rename = "NetChangeInCash", default)]
    pub net_change_in_cash: f64,
    /// Reported free cash flow, if the source stated one.
    #[serde(rename = "FreeCashFlow", default, skip_serializing_if = "Option::is_none")]
    pub free_cash_flow: Option<f64>,
}

/// A complete baseline report: three statements plus derived KPIs.
///
/// Immutable once registered; the pipeline only ever reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialReport {
    /// Income statement.
    pub income_statement: IncomeStatement,
    /// Balance sheet.
    #[serde(default)]
    pub balance_sheet: BalanceSheet,
    /// Cash flow statement.
    pub cash_flow: CashFlow,
    /// Derived KPIs such as `TaxRate`.
    #[serde(default)]
    pub kpis: BTreeMap<String, f64>,
}

impl FinancialReport {
    /// KPI key holding the effective tax rate.
    pub const TAX_RATE_KPI: &'static str = "TaxRate";

    /// The reported tax rate KPI, if any.
    pub fn tax_rate(&self) -> Option<f64> {
        self.kpis.get(Self::TAX_RATE_KPI).copied()
    }

    /// Gross margin of the baseline period (0 when revenue is not positive).
    pub fn gross_margin(&self) -> f64 {
        let is = &self.income_statement;
        if is.revenue > 0.0 {
            is.gross_profit / is.revenue
        } else {
            0.0
        }
    }

    /// A small, internally consistent report used in documentation and tests.
    pub fn sample() -> Self {
        let mut kpis = BTreeMap::new();
        kpis.insert(Self::TAX_RATE_KPI.to_string(), 0.25);

        let mut assets = BTreeMap::new();
        assets.insert("TotalAssets".to_string(), 5_000_000.0);
        let mut liabilities = BTreeMap::new();
        liabilities.insert("TotalLiabilities".to_string(), 2_000_000.0);
        let mut equity = BTreeMap::new();
        equity.insert("TotalEquity".to_string(), 3_000_000.0);

        Self {
            income_statement: IncomeStatement {
                revenue: 1_000_000.0,
                cost_of_goods_sold: 400_000.0,
                gross_profit: 600_000.0,
                opex: 300_000.0,
                ebitda: 300_000.0,
                depreciation_and_amortization: 50_000.0,
                ebit: 250_000.0,
                interest_expense: 20_000.0,
                taxes: 57_500.0,
                net_income: 172_500.0,
            },
            balance_sheet: BalanceSheet {
                assets,
                liabilities,
                equity,
                cash: Some(400_000.0),
                short_term_debt: None,
                long_term_debt: Some(1_000_000.0),
            },
            cash_flow: CashFlow {
                net_income: 172_500.0,
                depreciation: 50_000.0,
                change_in_working_capital: -10_000.0,
                cash_from_operations: 212_500.0,
                capex: -60_000.0,
                cash_from_investing: -60_000.0,
                cash_from_financing: -50_000.0,
                net_change_in_cash: 102_500.0,
                free_cash_flow: Some(152_500.0),
            },
            kpis,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_report_is_consistent() {
        let report = FinancialReport::sample();
        let bs = &report.balance_sheet;
        assert_eq!(bs.total_assets(), bs.total_liabilities() + bs.total_equity());
        assert_eq!(report.tax_rate(), Some(0.25));
        assert!((report.gross_margin() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_totals_fall_back_to_sum() {
        let mut bs = BalanceSheet::default();
        bs.assets.insert("Cash".to_string(), 10.0);
        bs.assets.insert("Receivables".to_string(), 5.0);
        assert_eq!(bs.total_assets(), 15.0);
    }

    #[test]
    fn test_wire_names_follow_extraction_contract() {
        let json = serde_json::to_value(FinancialReport::sample()).unwrap();
        assert_eq!(json["income_statement"]["Revenue"], 1_000_000.0);
        assert_eq!(json["income_statement"]["OpEx"], 300_000.0);
        assert_eq!(json["cash_flow"]["CapEx"], -60_000.0);
        assert_eq!(json["kpis"]["TaxRate"], 0.25);
    }

    #[test]
    fn test_missing_required_line_item_is_rejected() {
        let json = r#"{
            "income_statement": {"Revenue": 100.0, "GrossProfit": 60.0,
                                 "DepreciationAndAmortization": 1.0, "InterestExpense": 0.0},
            "cash_flow": {"ChangeInWorkingCapital": 0.0, "CapEx": 0.0}
        }"#;
        let parsed: Result<FinancialReport, _> = serde_json::from_str(json);
        let err = parsed.unwrap_err().to_string();
        assert!(err.contains("OpEx"));
    }
}
