//! Sanity checks for baseline statements and scenario deltas.
//!
//! Report checks never reject a report outright; they produce a list of
//! [`ValidationIssue`]s which the caller may surface or log. Delta checks are
//! stricter: out-of-range deltas and a non-positive effective discount rate
//! are hard [`ValidationError`]s, while very large deltas only warn.

use serde::{Deserialize, Serialize};

use crate::types::{BalanceSheet, FinancialReport, IncomeStatement, ScenarioDeltas, ValidationError};
use crate::BPS_PER_UNIT;

/// Absolute difference (currency units) tolerated by [`check_balance_sheet`].
pub const BALANCE_TOLERANCE: f64 = 1.0;

/// Deltas at or above this magnitude (bps) produce a warning.
pub const LARGE_DELTA_BPS: i32 = 5_000;

/// How serious an issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Suspicious but usable.
    Warning,
    /// The statement is internally inconsistent.
    Error,
}

/// A single finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Severity.
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
}

impl ValidationIssue {
    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

/// Outcome of the accounting identity check `Assets = Liabilities + Equity`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceCheck {
    /// Whether `|difference| < BALANCE_TOLERANCE`.
    pub is_balanced: bool,
    /// `total_assets − (total_liabilities + total_equity)`.
    pub difference: f64,
    /// Total assets used.
    pub total_assets: f64,
    /// Total liabilities plus equity used.
    pub total_liabilities_and_equity: f64,
}

/// Check the accounting identity on `bs`.
pub fn check_balance_sheet(bs: &BalanceSheet) -> BalanceCheck {
    let total_assets = bs.total_assets();
    let total_liabilities_and_equity = bs.total_liabilities() + bs.total_equity();
    let difference = total_assets - total_liabilities_and_equity;
    BalanceCheck {
        is_balanced: difference.abs() < BALANCE_TOLERANCE,
        difference,
        total_assets,
        total_liabilities_and_equity,
    }
}

/// Check income-statement margins.
pub fn validate_income_statement(is: &IncomeStatement) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if is.revenue <= 0.0 {
        issues.push(ValidationIssue::error(format!(
            "Revenue must be positive, got {:.2}",
            is.revenue
        )));
        return issues;
    }

    let gross_margin = is.gross_profit / is.revenue;
    if gross_margin < 0.0 {
        issues.push(ValidationIssue::warning(format!(
            "Negative gross margin ({:.1}%)",
            gross_margin * 100.0
        )));
    }
    if gross_margin > 1.0 {
        issues.push(ValidationIssue::error(format!(
            "Gross margin exceeds 100% ({:.1}%)",
            gross_margin * 100.0
        )));
    }
    if is.opex > is.revenue {
        issues.push(ValidationIssue::warning(format!(
            "Operating expenses ({:.2}) exceed revenue ({:.2})",
            is.opex, is.revenue
        )));
    }
    issues
}

/// Run every statement check on `report`.
pub fn validate_report(report: &FinancialReport) -> Vec<ValidationIssue> {
    let mut issues = validate_income_statement(&report.income_statement);

    let has_balance_sheet = !(report.balance_sheet.assets.is_empty()
        && report.balance_sheet.liabilities.is_empty()
        && report.balance_sheet.equity.is_empty());
    if has_balance_sheet {
        let check = check_balance_sheet(&report.balance_sheet);
        if !check.is_balanced {
            issues.push(ValidationIssue::error(format!(
                "Balance sheet doesn't balance: assets {:.2} vs liabilities + equity {:.2} (difference {:.2})",
                check.total_assets, check.total_liabilities_and_equity, check.difference
            )));
        }
    }

    if let Some(rate) = report.tax_rate() {
        if !(0.0..1.0).contains(&rate) {
            issues.push(ValidationIssue::error(format!(
                "Tax rate KPI must be in [0, 1), got {rate}"
            )));
        }
    }
    issues
}

/// Check scenario deltas against `bound_bps` and the base discount rate.
///
/// Returns the non-fatal warnings on success.
///
/// # Errors
///
/// - [`ValidationError::DeltaOutOfRange`] for the first delta with `|delta| > bound_bps`
/// - [`ValidationError::NonPositiveDiscountRate`] if `base_discount_rate + delta ≤ 0`
pub fn validate_deltas(
    deltas: &ScenarioDeltas,
    bound_bps: i32,
    base_discount_rate: f64,
) -> Result<Vec<ValidationIssue>, ValidationError> {
    let mut warnings = Vec::new();
    for (name, value) in deltas.named() {
        if value.unsigned_abs() > bound_bps.unsigned_abs() {
            return Err(ValidationError::DeltaOutOfRange {
                name,
                value,
                bound: bound_bps,
            });
        }
        if value.unsigned_abs() >= LARGE_DELTA_BPS.unsigned_abs() {
            warnings.push(ValidationIssue::warning(format!(
                "{name} of {value} bps is very large"
            )));
        }
    }

    let effective = base_discount_rate + deltas.discount_rate_delta();
    if effective <= 0.0 {
        return Err(ValidationError::NonPositiveDiscountRate {
            rate_bps: (effective * BPS_PER_UNIT).round() as i32,
        });
    }
    Ok(warnings)
}
