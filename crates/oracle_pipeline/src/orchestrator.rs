//! Scenario service: creation, background execution and the stage state machine.
//!
//! `PENDING → RUNNING(Simulation) → RUNNING(Critique) → RUNNING(Debate) → COMPLETED`,
//! with `FAILED` reachable from every RUNNING sub-state. A run executes the
//! three stages strictly in sequence, commits each result as soon as the stage
//! succeeds and stops at the first failure or cancellation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use oracle_agents::{CritiqueStage, DebateStage, RoundProgressFn};
use oracle_core::types::{
    CreateScenarioRequest, CriticVerdict, DebateResult, FinancialReport, Scenario, ScenarioDeltas,
    ScenarioId, ScenarioStatus, SimulationResults, StatusSnapshot, ValidationError,
};
use oracle_core::validation::validate_deltas;
use oracle_sim::{simulate_with, ProgressFn, SimulationConfig, SimulationError, SimulationHooks};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::cancel::{cancel_pair, CancelHandle, CancelToken, TIMED_OUT};
use crate::error::{PipelineError, StageFailure, StoreError};
use crate::progress::Stage;
use crate::render::{MarkdownRenderer, ReportRenderer};
use crate::reports::ReportRepository;
use crate::store::ScenarioStore;

/// Default bound on each delta, in bps.
pub const DEFAULT_MAX_DELTA_BPS: i32 = 10_000;

/// Default wall-clock limit of one run.
pub const DEFAULT_SCENARIO_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Tunables of the pipeline, passed in explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Monte Carlo configuration used for every run.
    pub simulation: SimulationConfig,
    /// Absolute bound on each scenario delta, in bps.
    pub max_delta_bps: i32,
    /// Wall-clock limit of one run; `None` disables it.
    pub scenario_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            max_delta_bps: DEFAULT_MAX_DELTA_BPS,
            scenario_timeout: Some(DEFAULT_SCENARIO_TIMEOUT),
        }
    }
}

/// Entry point for scenario operations.
///
/// Cheap to clone; clones share the store, the report repository and the
/// registry of active runs.
#[derive(Clone)]
pub struct ScenarioService {
    store: ScenarioStore,
    reports: ReportRepository,
    critic: CritiqueStage,
    debate: DebateStage,
    renderer: Arc<dyn ReportRenderer>,
    config: Arc<PipelineConfig>,
    active: Arc<Mutex<HashMap<ScenarioId, CancelHandle>>>,
}

impl ScenarioService {
    /// Create a service with an empty store and repository and the markdown renderer.
    pub fn new(critic: CritiqueStage, debate: DebateStage, config: PipelineConfig) -> Self {
        Self {
            store: ScenarioStore::new(),
            reports: ReportRepository::new(),
            critic,
            debate,
            renderer: Arc::new(MarkdownRenderer),
            config: Arc::new(config),
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Use a different report renderer.
    pub fn with_renderer(mut self, renderer: Arc<dyn ReportRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Registered baseline reports.
    pub fn reports(&self) -> &ReportRepository {
        &self.reports
    }

    /// Renderer used by [`ScenarioService::generate_report`].
    pub fn renderer(&self) -> &dyn ReportRenderer {
        self.renderer.as_ref()
    }

    /// Configuration in use.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Number of runs currently executing.
    pub async fn active_runs(&self) -> usize {
        self.active.lock().await.len()
    }

    // =====================================================================
    // Operations
    // =====================================================================

    /// Validate and store a new scenario, then start its run in the background.
    ///
    /// Returns the scenario as stored, in PENDING.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Validation`] for an unknown report, a delta outside
    /// `±max_delta_bps` or a non-positive effective discount rate. Nothing is
    /// stored in that case.
    pub async fn create_scenario(&self, request: CreateScenarioRequest) -> Result<Scenario, PipelineError> {
        if !self.reports.contains(request.report_id).await {
            return Err(ValidationError::UnknownReport(request.report_id).into());
        }
        let deltas = request.deltas();
        let warnings = validate_deltas(
            &deltas,
            self.config.max_delta_bps,
            self.config.simulation.base_discount_rate(),
        )?;

        let scenario = Scenario::new(request.report_id, deltas);
        for warning in &warnings {
            warn!(scenario_id = %scenario.id, "{}", warning.message);
        }
        self.store.insert(scenario.clone()).await?;
        info!(
            scenario_id = %scenario.id,
            report_id = %scenario.report_id,
            revenue_growth_delta_bps = deltas.revenue_growth_delta_bps,
            opex_delta_bps = deltas.opex_delta_bps,
            discount_rate_delta_bps = deltas.discount_rate_delta_bps,
            "scenario created"
        );

        self.trigger(scenario.id).await?;
        Ok(scenario)
    }

    /// Full scenario record.
    pub async fn get_scenario(&self, id: ScenarioId) -> Result<Scenario, PipelineError> {
        Ok(self.store.get(id).await?)
    }

    /// Polling view `{status, progress, error_message}`.
    pub async fn get_scenario_status(&self, id: ScenarioId) -> Result<StatusSnapshot, PipelineError> {
        Ok(self.store.status(id).await?)
    }

    /// Claim a PENDING scenario and execute it on a background task.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::NotFound`] for an unknown id
    /// - [`PipelineError::AlreadyStarted`] if the scenario is not PENDING
    pub async fn trigger(&self, id: ScenarioId) -> Result<(), PipelineError> {
        let scenario = self.store.claim(id).await.map_err(|err| match err {
            StoreError::InvalidTransition { .. } => PipelineError::AlreadyStarted(id),
            other => other.into(),
        })?;

        let Some(baseline) = self.reports.get(scenario.report_id).await else {
            let failure = StageFailure::Internal(format!("baseline report {} is not registered", scenario.report_id));
            self.store.fail(id, failure.to_string()).await?;
            return Err(ValidationError::UnknownReport(scenario.report_id).into());
        };

        let (handle, token) = cancel_pair(self.config.scenario_timeout);
        self.active.lock().await.insert(id, handle);

        let service = self.clone();
        let span = info_span!("scenario", scenario_id = %id);
        tokio::spawn(service.execute(id, baseline, scenario.deltas, token).instrument(span));
        Ok(())
    }

    /// Request cancellation of an active run.
    ///
    /// The run fails with `cancelled: <reason>` at its next stage boundary or
    /// provider call; results committed before that stay visible.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::NotFound`] for an unknown id
    /// - [`PipelineError::NotRunning`] if the scenario has no active run
    pub async fn cancel(&self, id: ScenarioId, reason: impl Into<String>) -> Result<(), PipelineError> {
        let snapshot = self.store.status(id).await?;
        let active = self.active.lock().await;
        match active.get(&id) {
            Some(handle) if snapshot.status == ScenarioStatus::Running => {
                let reason = reason.into();
                if handle.cancel(reason.clone()) {
                    info!(scenario_id = %id, %reason, "cancellation requested");
                }
                Ok(())
            }
            _ => Err(PipelineError::NotRunning(id)),
        }
    }

    /// Cancel every active run; returns how many were signalled.
    pub async fn cancel_all(&self, reason: &str) -> usize {
        let active = self.active.lock().await;
        let signalled = active.values().filter(|handle| handle.cancel(reason)).count();
        if signalled > 0 {
            info!(runs = signalled, reason, "cancelled active runs");
        }
        signalled
    }

    /// Render the report document of a COMPLETED scenario.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::NotFound`] for an unknown id
    /// - [`PipelineError::NotReady`] unless the scenario is COMPLETED
    /// - [`PipelineError::Render`] if the renderer fails
    pub async fn generate_report(&self, id: ScenarioId) -> Result<Vec<u8>, PipelineError> {
        let scenario = self.store.get(id).await?;
        if scenario.status != ScenarioStatus::Completed {
            return Err(PipelineError::NotReady {
                id,
                status: scenario.status,
            });
        }
        let baseline = self
            .reports
            .get(scenario.report_id)
            .await
            .ok_or(ValidationError::UnknownReport(scenario.report_id))?;

        let bytes = self.renderer.render(&baseline, &scenario)?;
        info!(scenario_id = %id, bytes = bytes.len(), "report generated");
        Ok(bytes)
    }

    // =====================================================================
    // Background run
    // =====================================================================

    async fn execute(self, id: ScenarioId, baseline: Arc<FinancialReport>, deltas: ScenarioDeltas, token: CancelToken) {
        info!("pipeline started");
        let recorded = match self.run_stages(id, &baseline, deltas, &token).await {
            Ok(final_verdict) => {
                info!(%final_verdict, "pipeline completed");
                Ok(())
            }
            Err(failure) => {
                match &failure {
                    StageFailure::Cancelled(reason) => warn!(%reason, "pipeline cancelled"),
                    other => error!(error = %other, "pipeline failed"),
                }
                self.store.fail(id, failure.to_string()).await
            }
        };
        if let Err(err) = recorded {
            error!(error = %err, "could not record pipeline outcome");
        }
        self.active.lock().await.remove(&id);
    }

    async fn run_stages(
        &self,
        id: ScenarioId,
        baseline: &Arc<FinancialReport>,
        deltas: ScenarioDeltas,
        token: &CancelToken,
    ) -> Result<String, StageFailure> {
        let simulation = self.run_simulation(id, Arc::clone(baseline), deltas, token).await?;
        self.store.commit_simulation(id, simulation.clone()).await?;
        info!(
            stage = Stage::Simulation.name(),
            trials = simulation.trials,
            median_npv = simulation.median_npv,
            "stage committed"
        );

        let verdict = race(token, self.critic.critique(baseline, &simulation))
            .await?
            .map_err(StageFailure::Critique)?;
        self.store.commit_critique(id, verdict.clone()).await?;
        info!(stage = Stage::Critique.name(), verdict = verdict.verdict.as_str(), "stage committed");

        let debate = self.run_debate(id, baseline, &simulation, &verdict, token).await?;
        let final_verdict = debate.final_verdict.clone();
        info!(
            stage = Stage::Debate.name(),
            rounds = debate.total_rounds(),
            converged = debate.converged,
            "stage committed"
        );
        self.store.commit_debate(id, debate).await?;

        // Settled under the registry lock: an acknowledged cancel always lands first.
        let mut active = self.active.lock().await;
        if let Some(reason) = token.reason() {
            return Err(StageFailure::Cancelled(reason));
        }
        active.remove(&id);
        self.store.finalize(id, final_verdict.clone()).await?;
        Ok(final_verdict)
    }

    async fn run_simulation(
        &self,
        id: ScenarioId,
        baseline: Arc<FinancialReport>,
        deltas: ScenarioDeltas,
        token: &CancelToken,
    ) -> Result<SimulationResults, StageFailure> {
        let progress = self.forward_progress(id, Stage::Simulation);
        let on_chunk: Arc<ProgressFn> = Arc::new(move |fraction: f64| {
            let _ = progress.send(fraction);
        });
        let hooks = SimulationHooks {
            progress: Some(on_chunk),
            cancel: Some(token.flag()),
        };
        let config = self.config.simulation.clone();
        debug!(trials = config.trials(), "simulation dispatched to the blocking pool");

        let task = tokio::task::spawn_blocking(move || simulate_with(&baseline, &deltas, &config, &hooks));
        match race(token, task).await? {
            Ok(Ok(results)) => Ok(results),
            Ok(Err(SimulationError::Cancelled)) => Err(StageFailure::Cancelled(
                token.reason().unwrap_or_else(|| TIMED_OUT.to_string()),
            )),
            Ok(Err(err)) => Err(err.into()),
            Err(join) => Err(StageFailure::Internal(format!("simulation worker failed: {join}"))),
        }
    }

    async fn run_debate(
        &self,
        id: ScenarioId,
        baseline: &FinancialReport,
        simulation: &SimulationResults,
        verdict: &CriticVerdict,
        token: &CancelToken,
    ) -> Result<DebateResult, StageFailure> {
        let progress = self.forward_progress(id, Stage::Debate);
        let on_round = move |done: u32, max: u32| {
            let _ = progress.send(f64::from(done) / f64::from(max.max(1)));
        };
        let on_round: &RoundProgressFn = &on_round;

        race(
            token,
            self.debate.debate_with_progress(baseline, simulation, verdict, Some(on_round)),
        )
        .await?
        .map_err(StageFailure::Debate)
    }

    /// Spawn a task moving stage sub-progress into the store.
    ///
    /// The task ends when the returned sender is dropped.
    fn forward_progress(&self, id: ScenarioId, stage: Stage) -> watch::Sender<f64> {
        let (tx, mut rx) = watch::channel(0.0_f64);
        let store = self.store.clone();
        tokio::spawn(
            async move {
                while rx.changed().await.is_ok() {
                    let progress = stage.within(*rx.borrow_and_update());
                    match store.advance_progress(id, progress).await {
                        Ok(true) => debug!(stage = stage.name(), progress, "progress advanced"),
                        Ok(false) => {}
                        Err(err) => {
                            warn!(error = %err, "progress update dropped");
                            break;
                        }
                    }
                }
            }
            .in_current_span(),
        );
        tx
    }
}

/// Await `work` unless the run is cancelled first.
async fn race<F: Future>(token: &CancelToken, work: F) -> Result<F::Output, StageFailure> {
    tokio::select! {
        biased;
        reason = token.cancelled() => Err(StageFailure::Cancelled(reason)),
        output = work => Ok(output),
    }
}
