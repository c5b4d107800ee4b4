//! In-memory scenario store.
//!
//! Every mutation is one write-locked transition checked against the
//! scenario state machine:
//!
//! - `claim`: PENDING → RUNNING (at most one run per scenario)
//! - `commit_*`: attach a stage result while RUNNING, in stage order
//! - `finalize` / `fail`: RUNNING → COMPLETED / FAILED
//!
//! Committed results are never cleared and terminal scenarios never change.
//! Reads copy the record out under a read lock.

use std::collections::HashMap;
use std::sync::Arc;

use oracle_core::types::{
    CriticVerdict, DebateResult, Scenario, ScenarioId, ScenarioStatus, SimulationResults,
    StatusSnapshot,
};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::progress::{COMPLETE, CRITIQUE_DONE, DEBATE_DONE, SIMULATION_DONE};

// =========================================================================
// Scenario Store
// =========================================================================

/// Thread-safe scenario store shared by the service and its background runs.
///
/// # Example
///
/// ```ignore
/// let store = ScenarioStore::new();
/// store.insert(scenario.clone()).await?;
/// store.claim(scenario.id).await?;
/// store.advance_progress(scenario.id, 12).await?;
/// let snapshot = store.status(scenario.id).await?;
/// ```
#[derive(Debug, Default)]
pub struct ScenarioStore {
    scenarios: Arc<RwLock<HashMap<ScenarioId, Scenario>>>,
}

impl Clone for ScenarioStore {
    fn clone(&self) -> Self {
        Self {
            scenarios: Arc::clone(&self.scenarios),
        }
    }
}

impl ScenarioStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new scenario; an existing record is never replaced.
    pub async fn insert(&self, scenario: Scenario) -> Result<(), StoreError> {
        let mut scenarios = self.scenarios.write().await;
        if scenarios.contains_key(&scenario.id) {
            return Err(StoreError::Duplicate(scenario.id));
        }
        scenarios.insert(scenario.id, scenario);
        Ok(())
    }

    /// Copy of the full scenario record.
    pub async fn get(&self, id: ScenarioId) -> Result<Scenario, StoreError> {
        self.scenarios
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    /// `{status, progress, error_message}` without copying any results.
    pub async fn status(&self, id: ScenarioId) -> Result<StatusSnapshot, StoreError> {
        self.scenarios
            .read()
            .await
            .get(&id)
            .map(Scenario::status_snapshot)
            .ok_or(StoreError::NotFound(id))
    }

    /// Number of stored scenarios.
    pub async fn len(&self) -> usize {
        self.scenarios.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.scenarios.read().await.is_empty()
    }

    /// Atomically move a PENDING scenario to RUNNING.
    ///
    /// Exactly one of any number of concurrent claims succeeds.
    pub async fn claim(&self, id: ScenarioId) -> Result<Scenario, StoreError> {
        self.update(id, |scenario| {
            transition(scenario, ScenarioStatus::Running)?;
            Ok(scenario.clone())
        })
        .await
    }

    /// Raise progress of a RUNNING scenario.
    ///
    /// Lower values and non-RUNNING scenarios are ignored; returns whether
    /// progress changed.
    pub async fn advance_progress(&self, id: ScenarioId, progress: u8) -> Result<bool, StoreError> {
        self.update(id, |scenario| {
            if scenario.status != ScenarioStatus::Running || progress <= scenario.progress {
                return Ok(false);
            }
            scenario.progress = progress.min(COMPLETE);
            Ok(true)
        })
        .await
    }

    /// Attach simulation results and move progress to the end of its band.
    pub async fn commit_simulation(
        &self,
        id: ScenarioId,
        results: SimulationResults,
    ) -> Result<(), StoreError> {
        self.update(id, |scenario| {
            require_running(scenario, "simulation")?;
            if scenario.simulation_results.is_some() {
                return Err(StoreError::StageOrder { id, stage: "simulation" });
            }
            scenario.simulation_results = Some(results);
            scenario.progress = scenario.progress.max(SIMULATION_DONE);
            Ok(())
        })
        .await
    }

    /// Attach the critic verdict; requires committed simulation results.
    pub async fn commit_critique(&self, id: ScenarioId, verdict: CriticVerdict) -> Result<(), StoreError> {
        self.update(id, |scenario| {
            require_running(scenario, "critique")?;
            if scenario.simulation_results.is_none() || scenario.critic_verdict.is_some() {
                return Err(StoreError::StageOrder { id, stage: "critique" });
            }
            scenario.critic_verdict = Some(verdict);
            scenario.progress = scenario.progress.max(CRITIQUE_DONE);
            Ok(())
        })
        .await
    }

    /// Attach the debate result; requires a committed critic verdict.
    pub async fn commit_debate(&self, id: ScenarioId, result: DebateResult) -> Result<(), StoreError> {
        self.update(id, |scenario| {
            require_running(scenario, "debate")?;
            if scenario.critic_verdict.is_none() || scenario.debate_result.is_some() {
                return Err(StoreError::StageOrder { id, stage: "debate" });
            }
            scenario.debate_result = Some(result);
            scenario.progress = scenario.progress.max(DEBATE_DONE);
            Ok(())
        })
        .await
    }

    /// Move to COMPLETED with the final verdict; requires a committed debate.
    pub async fn finalize(&self, id: ScenarioId, final_verdict: String) -> Result<(), StoreError> {
        self.update(id, |scenario| {
            if scenario.debate_result.is_none() {
                return Err(StoreError::StageOrder { id, stage: "final verdict" });
            }
            transition(scenario, ScenarioStatus::Completed)?;
            scenario.final_verdict = Some(final_verdict);
            scenario.progress = COMPLETE;
            Ok(())
        })
        .await
    }

    /// Move to FAILED with `message`; committed results are kept.
    pub async fn fail(&self, id: ScenarioId, message: impl Into<String>) -> Result<(), StoreError> {
        let message = message.into();
        self.update(id, |scenario| {
            transition(scenario, ScenarioStatus::Failed)?;
            scenario.error_message = Some(message);
            Ok(())
        })
        .await
    }

    async fn update<T>(
        &self,
        id: ScenarioId,
        apply: impl FnOnce(&mut Scenario) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut scenarios = self.scenarios.write().await;
        let scenario = scenarios.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        apply(scenario)
    }
}

fn transition(scenario: &mut Scenario, next: ScenarioStatus) -> Result<(), StoreError> {
    if !scenario.status.can_transition_to(next) {
        return Err(StoreError::InvalidTransition {
            id: scenario.id,
            from: scenario.status,
            to: next,
        });
    }
    scenario.status = next;
    Ok(())
}

fn require_running(scenario: &Scenario, stage: &'static str) -> Result<(), StoreError> {
    if scenario.status == ScenarioStatus::Running {
        Ok(())
    } else {
        Err(StoreError::StageOrder { id: scenario.id, stage })
    }
}

// =========================================================================
// Tests
// =========================================================================
