//! Core data types shared by every pipeline stage.
//!
//! This module provides:
//! - `report`: baseline financial statements and KPIs
//! - `scenario`: scenario identity, deltas, lifecycle status
//! - `results`: Simulation, Critique and Debate stage outputs
//! - `error`: projection and validation errors

pub mod error;
pub mod report;
pub mod results;
pub mod scenario;

pub use error::{ProjectionError, ValidationError};
pub use report::{BalanceSheet, CashFlow, FinancialReport, IncomeStatement, ReportId};
pub use results::{
    AnalystRole, ConfidenceLevel, CriticVerdict, DebateResult, DebateRound, Recommendation,
    SimulationResults, Verdict,
};
pub use scenario::{
    CreateScenarioRequest, Scenario, ScenarioDeltas, ScenarioId, ScenarioStatus, StatusSnapshot,
};
