//! # oracle_core: Contracts and Projection for the Scenario Evaluation Pipeline
//!
//! ## Layer 1 (Foundation) Role
//!
//! oracle_core is the bottom layer of the workspace and provides:
//! - Baseline report types: `FinancialReport`, `IncomeStatement`, `BalanceSheet`, `CashFlow` (`types::report`)
//! - Scenario state types: `Scenario`, `ScenarioStatus`, `StatusSnapshot` (`types::scenario`)
//! - Stage result contracts: `SimulationResults`, `CriticVerdict`, `DebateResult` (`types::results`)
//! - The pure financial projector (`projector`)
//! - Statement and delta sanity checks (`validation`)
//!
//! ## Zero Dependency Principle
//!
//! Layer 1 has no dependencies on other oracle_* crates and performs no I/O.
//! Every type that crosses a stage boundary lives here so that the simulator,
//! the reasoning stages and the orchestrator agree on one wire shape.
//!
//! ## Usage Examples
//!
//! ```rust
//! use oracle_core::projector::{project, ProjectionAssumptions, ProjectionInputs};
//! use oracle_core::types::FinancialReport;
//!
//! let report = FinancialReport::sample();
//! let inputs = ProjectionInputs::from_bps(200, -100, 0);
//! let projected = project(&report, &inputs, &ProjectionAssumptions::default()).unwrap();
//! assert!(projected.revenue > report.income_statement.revenue);
//! ```

#![warn(missing_docs)]

pub mod projector;
pub mod types;
pub mod validation;

/// Number of basis points in one unit (100%).
pub const BPS_PER_UNIT: f64 = 10_000.0;

/// Convert basis points to a decimal fraction (`250` → `0.025`).
#[inline]
pub fn bps_to_decimal(bps: i32) -> f64 {
    f64::from(bps) / BPS_PER_UNIT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bps_to_decimal() {
        assert_eq!(bps_to_decimal(0), 0.0);
        assert_eq!(bps_to_decimal(10_000), 1.0);
        assert_eq!(bps_to_decimal(-50), -0.005);
    }
}
