//! Scenario identity, deltas and lifecycle status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::report::ReportId;
use super::results::{CriticVerdict, DebateResult, SimulationResults};
use crate::bps_to_decimal;

/// Identifier of a scenario.
pub type ScenarioId = Uuid;

/// Counterfactual deltas applied to a baseline report, in basis points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScenarioDeltas {
    /// Change applied to revenue growth.
    pub revenue_growth_delta_bps: i32,
    /// Relative change applied to operating expenses.
    pub opex_delta_bps: i32,
    /// Additive change applied to the discount rate.
    pub discount_rate_delta_bps: i32,
}

impl ScenarioDeltas {
    /// Create a delta set from raw basis points.
    pub fn new(revenue_growth_delta_bps: i32, opex_delta_bps: i32, discount_rate_delta_bps: i32) -> Self {
        Self {
            revenue_growth_delta_bps,
            opex_delta_bps,
            discount_rate_delta_bps,
        }
    }

    /// Revenue growth delta as a decimal fraction.
    pub fn revenue_growth(&self) -> f64 {
        bps_to_decimal(self.revenue_growth_delta_bps)
    }

    /// OpEx delta as a decimal fraction.
    pub fn opex_delta(&self) -> f64 {
        bps_to_decimal(self.opex_delta_bps)
    }

    /// Discount-rate delta as a decimal fraction.
    pub fn discount_rate_delta(&self) -> f64 {
        bps_to_decimal(self.discount_rate_delta_bps)
    }

    /// Iterate over `(name, bps)` pairs, in declaration order.
    pub fn named(&self) -> [(&'static str, i32); 3] {
        [
            ("revenue_growth_delta_bps", self.revenue_growth_delta_bps),
            ("opex_delta_bps", self.opex_delta_bps),
            ("discount_rate_delta_bps", self.discount_rate_delta_bps),
        ]
    }
}

/// Scenario lifecycle status.
///
/// Transitions are monotone: `Pending → Running → {Completed | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScenarioStatus {
    /// Created, not yet claimed by a background job.
    Pending,
    /// Claimed by exactly one background job.
    Running,
    /// All three stages succeeded and the final verdict is set.
    Completed,
    /// A stage failed or the run was cancelled.
    Failed,
}

impl ScenarioStatus {
    /// Check if the status is terminal (Completed or Failed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: ScenarioStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }

    /// Upper-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full scenario record, including whichever result fields are populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario id.
    pub id: ScenarioId,
    /// Baseline report this scenario perturbs.
    pub report_id: ReportId,
    /// Counterfactual deltas.
    #[serde(flatten)]
    pub deltas: ScenarioDeltas,
    /// Current lifecycle status.
    pub status: ScenarioStatus,
    /// Progress percentage in [0, 100].
    pub progress: u8,
    /// Human-readable failure summary (FAILED only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Simulation stage output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulation_results: Option<SimulationResults>,
    /// Critique stage output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critic_verdict: Option<CriticVerdict>,
    /// Debate stage output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debate_result: Option<DebateResult>,
    /// Final verdict derived from the debate (COMPLETED only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_verdict: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Scenario {
    /// Create a new PENDING scenario with a fresh id.
    pub fn new(report_id: ReportId, deltas: ScenarioDeltas) -> Self {
        Self {
            id: Uuid::new_v4(),
            report_id,
            deltas,
            status: ScenarioStatus::Pending,
            progress: 0,
            error_message: None,
            simulation_results: None,
            critic_verdict: None,
            debate_result: None,
            final_verdict: None,
            created_at: Utc::now(),
        }
    }

    /// The cheap polling view of this scenario.
    pub fn status_snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            status: self.status,
            progress: self.progress,
            error_message: self.error_message.clone(),
        }
    }
}

/// Polling view: `{status, progress, error_message?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Current lifecycle status.
    pub status: ScenarioStatus,
    /// Progress percentage in [0, 100].
    pub progress: u8,
    /// Failure summary, if FAILED.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Request body for scenario creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateScenarioRequest {
    /// Baseline report id.
    pub report_id: ReportId,
    /// Revenue growth delta in bps.
    pub revenue_growth_delta_bps: i32,
    /// OpEx delta in bps.
    pub opex_delta_bps: i32,
    /// Discount-rate delta in bps.
    pub discount_rate_delta_bps: i32,
}

impl CreateScenarioRequest {
    /// The deltas carried by this request.
    pub fn deltas(&self) -> ScenarioDeltas {
        ScenarioDeltas::new(
            self.revenue_growth_delta_bps,
            self.opex_delta_bps,
            self.discount_rate_delta_bps,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions_are_monotone() {
        use ScenarioStatus::*;
        assert!(Pending.can_transition_to(Running));
        assert!(Running.can_transition_to(Completed));
        assert!(Running.can_transition_to(Failed));

        for terminal in [Completed, Failed] {
            for next in [Pending, Running, Completed, Failed] {
                assert!(!terminal.can_transition_to(next));
            }
        }
        assert!(!Running.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Completed));
    }

    #[test]
    fn test_status_serialises_upper_case() {
        let json = serde_json::to_string(&ScenarioStatus::Running).unwrap();
        assert_eq!(json, "\"RUNNING\"");
        let parsed: ScenarioStatus = serde_json::from_str("\"FAILED\"").unwrap();
        assert_eq!(parsed, ScenarioStatus::Failed);
    }

    #[test]
    fn test_new_scenario_is_pending() {
        let scenario = Scenario::new(Uuid::new_v4(), ScenarioDeltas::new(200, -100, -50));
        assert_eq!(scenario.status, ScenarioStatus::Pending);
        assert_eq!(scenario.progress, 0);
        assert!(scenario.simulation_results.is_none());

        let json = serde_json::to_value(&scenario).unwrap();
        assert_eq!(json["revenue_growth_delta_bps"], 200);
        assert!(json.get("error_message").is_none());
    }

    #[test]
    fn test_deltas_as_decimals() {
        let deltas = ScenarioDeltas::new(200, -100, -50);
        assert!((deltas.revenue_growth() - 0.02).abs() < 1e-15);
        assert!((deltas.opex_delta() + 0.01).abs() < 1e-15);
        assert!((deltas.discount_rate_delta() + 0.005).abs() < 1e-15);
    }
}
