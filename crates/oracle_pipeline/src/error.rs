//! Error types for the pipeline layer.
//!
//! This module provides:
//! - `StoreError`: rejected state-machine transitions in the scenario store
//! - `RenderError`: report document generation failures
//! - `PipelineError`: errors returned by [`ScenarioService`](crate::ScenarioService) operations
//! - `StageFailure`: why a background run ended in FAILED

use oracle_agents::StageError;
use oracle_core::types::{ScenarioId, ScenarioStatus, ValidationError};
use oracle_sim::SimulationError;
use thiserror::Error;

/// A store mutation that the scenario state machine does not allow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No scenario with this id.
    #[error("scenario {0} not found")]
    NotFound(ScenarioId),

    /// A scenario with this id already exists.
    #[error("scenario {0} already exists")]
    Duplicate(ScenarioId),

    /// The status change is not a legal transition.
    #[error("scenario {id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Scenario id.
        id: ScenarioId,
        /// Current status.
        from: ScenarioStatus,
        /// Requested status.
        to: ScenarioStatus,
    },

    /// A stage result arrived out of order or twice.
    #[error("scenario {id}: {stage} result cannot be committed in the current state")]
    StageOrder {
        /// Scenario id.
        id: ScenarioId,
        /// Stage whose result was rejected.
        stage: &'static str,
    },
}

/// Report document generation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// A section needs a result the scenario does not carry.
    #[error("scenario is missing its {0}")]
    MissingSection(&'static str),

    /// Formatting the document failed.
    #[error("failed to format document")]
    Format(#[from] std::fmt::Error),
}

/// Error returned by scenario service operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// Input rejected at creation; the scenario was not stored.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Unknown scenario id.
    #[error("scenario {0} not found")]
    NotFound(ScenarioId),

    /// The scenario was already claimed by a run.
    #[error("scenario {0} has already been started")]
    AlreadyStarted(ScenarioId),

    /// Cancellation requested for a scenario with no active run.
    #[error("scenario {0} is not running")]
    NotRunning(ScenarioId),

    /// The report document is only available once the scenario completed.
    #[error("scenario {id} is {status}; the report is available once it is COMPLETED")]
    NotReady {
        /// Scenario id.
        id: ScenarioId,
        /// Current status.
        status: ScenarioStatus,
    },

    /// Store rejected an operation.
    #[error("store error: {0}")]
    Store(StoreError),

    /// The renderer failed.
    #[error("report rendering failed: {0}")]
    Render(#[from] RenderError),
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}

/// Reason a run ended in FAILED; its display text becomes `error_message`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StageFailure {
    /// The simulation stage failed.
    #[error("simulation failed: {0}")]
    Simulation(#[from] SimulationError),

    /// The critique stage failed.
    #[error("critique failed: {0}")]
    Critique(StageError),

    /// The debate stage failed.
    #[error("debate failed: {0}")]
    Debate(StageError),

    /// The run was cancelled or timed out.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Bookkeeping failed: the store rejected a commit or a worker died.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for StageFailure {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oracle_agents::ProviderError;
    use std::time::Duration;

    #[test]
    fn test_failure_messages_are_prefixed_by_stage() {
        let sim = StageFailure::from(SimulationError::NonPositiveDiscountRate {
            trial: None,
            rate: -0.02,
        });
        assert!(sim.to_string().starts_with("simulation failed: "));

        let critique = StageFailure::Critique(StageError::RetriesExhausted {
            attempts: 3,
            last: Box::new(StageError::Provider(ProviderError::Timeout(Duration::from_secs(60)))),
        });
        assert!(critique.to_string().starts_with("critique failed: gave up after 3 attempts"));

        let debate = StageFailure::Debate(StageError::malformed("no recommendation"));
        assert!(debate.to_string().starts_with("debate failed: "));

        assert_eq!(
            StageFailure::Cancelled("timed out".to_string()).to_string(),
            "cancelled: timed out"
        );
    }

    #[test]
    fn test_store_not_found_maps_to_not_found() {
        let id = ScenarioId::nil();
        assert_eq!(PipelineError::from(StoreError::NotFound(id)), PipelineError::NotFound(id));

        let order = StoreError::StageOrder { id, stage: "debate" };
        assert!(matches!(PipelineError::from(order), PipelineError::Store(_)));
    }
}
