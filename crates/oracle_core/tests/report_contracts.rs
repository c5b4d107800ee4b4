//! Contract tests for baseline reports and scenario records.
//!
//! These exercise the JSON shapes exchanged with the extraction collaborator
//! and the polling clients, plus the projector on a deserialised report.

use approx::assert_relative_eq;
use oracle_core::projector::{project, ProjectionAssumptions, ProjectionInputs};
use oracle_core::types::{CreateScenarioRequest, FinancialReport, Scenario, ScenarioStatus};
use oracle_core::validation::{validate_report, Severity};

const EXTRACTED_REPORT: &str = r#"{
    "income_statement": {
        "Revenue": 100000, "CostOfGoodsSold": 40000, "GrossProfit": 60000,
        "OpEx": 30000, "EBITDA": 30000, "DepreciationAndAmortization": 5000,
        "EBIT": 25000, "InterestExpense": 2000, "Taxes": 5750, "NetIncome": 17250
    },
    "balance_sheet": {
        "Assets": {"TotalAssets": 150000},
        "Liabilities": {"TotalLiabilities": 50000},
        "Equity": {"TotalEquity": 100000}
    },
    "cash_flow": {
        "NetIncome": 17250, "Depreciation": 5000, "ChangeInWorkingCapital": -2000,
        "CashFromOperations": 20250, "CapEx": -8000, "CashFromInvesting": -8000,
        "CashFromFinancing": 0, "NetChangeInCash": 12250
    },
    "kpis": {"RevenueGrowth": 0.10, "EBITDAMargin": 0.30, "TaxRate": 0.25}
}"#;

// ============================================================================
// Report
// ============================================================================

#[test]
fn test_extracted_report_deserialises_and_validates() {
    let report: FinancialReport = serde_json::from_str(EXTRACTED_REPORT).unwrap();
    assert_eq!(report.income_statement.revenue, 100_000.0);
    assert_eq!(report.cash_flow.capex, -8_000.0);

    let issues = validate_report(&report);
    assert!(issues.iter().all(|i| i.severity != Severity::Error), "{issues:?}");
}

#[test]
fn test_projection_of_extracted_report() {
    let report: FinancialReport = serde_json::from_str(EXTRACTED_REPORT).unwrap();
    let projected = project(
        &report,
        &ProjectionInputs::from_bps(0, 0, 0),
        &ProjectionAssumptions::default(),
    )
    .unwrap();

    // 25000 × 0.75 + 5000 − 2000 − 8000
    assert_relative_eq!(projected.free_cash_flow, 13_750.0, max_relative = 1e-12);
    assert_relative_eq!(projected.ebitda, 30_000.0, max_relative = 1e-12);
}

#[test]
fn test_higher_growth_raises_fcf() {
    let report: FinancialReport = serde_json::from_str(EXTRACTED_REPORT).unwrap();
    let assumptions = ProjectionAssumptions::default();
    let low = project(&report, &ProjectionInputs::from_bps(-500, 0, 0), &assumptions).unwrap();
    let high = project(&report, &ProjectionInputs::from_bps(500, 0, 0), &assumptions).unwrap();
    assert!(high.free_cash_flow > low.free_cash_flow);
    assert!(high.revenue > low.revenue);
}

// ============================================================================
// Scenario
// ============================================================================

#[test]
fn test_create_request_and_pending_scenario_shape() {
    let report_id = uuid::Uuid::new_v4();
    let body = serde_json::json!({
        "report_id": report_id,
        "revenue_growth_delta_bps": 200,
        "opex_delta_bps": -100,
        "discount_rate_delta_bps": -50
    });
    let request: CreateScenarioRequest = serde_json::from_value(body).unwrap();
    let scenario = Scenario::new(request.report_id, request.deltas());

    let json = serde_json::to_value(&scenario).unwrap();
    assert_eq!(json["status"], "PENDING");
    assert_eq!(json["progress"], 0);
    assert_eq!(json["opex_delta_bps"], -100);
    assert!(json.get("simulation_results").is_none());

    let back: Scenario = serde_json::from_value(json).unwrap();
    assert_eq!(back.status, ScenarioStatus::Pending);
    assert_eq!(back.deltas, request.deltas());
}
