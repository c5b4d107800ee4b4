//! Monte Carlo simulator.
//!
//! For every trial the simulator samples a perturbation around each delta,
//! projects a full statement, values the resulting free cash flow path and
//! records one NPV sample. Trials run in fixed-size chunks on the rayon pool;
//! each chunk owns an RNG derived from `(seed, chunk_index)` and samples its
//! trials in index order, so a seeded run is bit-for-bit reproducible
//! regardless of the number of worker threads.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use oracle_core::projector::{project, ProjectionAssumptions, ProjectionInputs};
use oracle_core::types::{FinancialReport, ScenarioDeltas, SimulationResults};
use rayon::prelude::*;
use tracing::debug;

use crate::config::SimulationConfig;
use crate::dcf::DcfAssumptions;
use crate::error::SimulationError;
use crate::rng::SimRng;
use crate::stats;

/// Number of trials per RNG chunk.
pub const CHUNK_SIZE: usize = 1_000;

/// Progress callback receiving the completed fraction in [0, 1].
pub type ProgressFn = dyn Fn(f64) + Send + Sync;

/// Optional observers of a run.
#[derive(Clone, Default)]
pub struct SimulationHooks {
    /// Called after each completed chunk.
    pub progress: Option<Arc<ProgressFn>>,
    /// When set to `true`, remaining chunks abort with [`SimulationError::Cancelled`].
    pub cancel: Option<Arc<AtomicBool>>,
}

impl SimulationHooks {
    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for SimulationHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationHooks")
            .field("progress", &self.progress.is_some())
            .field("cancel", &self.cancel.is_some())
            .finish()
    }
}

/// Per-chunk samples.
#[derive(Default)]
struct ChunkSamples {
    growth: Vec<f64>,
    fcf: Vec<f64>,
    npv: Vec<f64>,
    revenue: Vec<f64>,
    ebitda: Vec<f64>,
}

impl ChunkSamples {
    fn with_capacity(n: usize) -> Self {
        Self {
            growth: Vec::with_capacity(n),
            fcf: Vec::with_capacity(n),
            npv: Vec::with_capacity(n),
            revenue: Vec::with_capacity(n),
            ebitda: Vec::with_capacity(n),
        }
    }
}

/// Run a simulation without observers.
///
/// # Errors
///
/// See [`simulate_with`].
pub fn simulate(
    baseline: &FinancialReport,
    deltas: &ScenarioDeltas,
    config: &SimulationConfig,
) -> Result<SimulationResults, SimulationError> {
    simulate_with(baseline, deltas, config, &SimulationHooks::default())
}

/// Run a simulation, reporting chunk progress and honouring cancellation.
///
/// # Errors
///
/// - [`SimulationError::Config`] if `config` is invalid
/// - [`SimulationError::Projection`] if the baseline is malformed
/// - [`SimulationError::NonPositiveDiscountRate`] if the unperturbed or any
///   sampled discount rate is ≤ 0 (the reported trial is one offending trial,
///   not necessarily the lowest index)
/// - [`SimulationError::Cancelled`] if the cancel flag was raised
pub fn simulate_with(
    baseline: &FinancialReport,
    deltas: &ScenarioDeltas,
    config: &SimulationConfig,
    hooks: &SimulationHooks,
) -> Result<SimulationResults, SimulationError> {
    config.validate()?;

    let projection = ProjectionAssumptions {
        base_discount_rate: config.base_discount_rate(),
        default_tax_rate: config.default_tax_rate(),
    };
    let dcf = DcfAssumptions {
        horizon_years: config.horizon_years(),
        terminal_growth: config.terminal_growth(),
        min_rate_spread: config.min_rate_spread(),
    };

    let mean_inputs = ProjectionInputs::from(*deltas);
    let effective_rate = config.base_discount_rate() + mean_inputs.discount_rate_delta;
    if effective_rate <= 0.0 {
        return Err(SimulationError::NonPositiveDiscountRate {
            trial: None,
            rate: effective_rate,
        });
    }
    // Surfaces malformed baselines before any sampling.
    let anchor = project(baseline, &mean_inputs, &projection)?;

    let trials = config.trials();
    let base_seed = config.seed().unwrap_or_else(SimRng::entropy_seed);
    let n_chunks = trials.div_ceil(CHUNK_SIZE);
    let completed = AtomicUsize::new(0);

    debug!(
        trials,
        chunks = n_chunks,
        seeded = config.seed().is_some(),
        effective_rate,
        "starting Monte Carlo simulation"
    );

    let chunks: Vec<ChunkSamples> = (0..n_chunks)
        .into_par_iter()
        .map(|chunk_index| {
            if hooks.is_cancelled() {
                return Err(SimulationError::Cancelled);
            }
            let start = chunk_index * CHUNK_SIZE;
            let end = (start + CHUNK_SIZE).min(trials);
            let samples = run_chunk(
                baseline,
                &mean_inputs,
                &projection,
                &dcf,
                config,
                SimRng::for_chunk(base_seed, chunk_index),
                start..end,
            )?;

            let done = completed.fetch_add(end - start, Ordering::Relaxed) + (end - start);
            if let Some(progress) = &hooks.progress {
                progress(done as f64 / trials as f64);
            }
            Ok(samples)
        })
        .collect::<Result<Vec<_>, SimulationError>>()?;

    let mut all = ChunkSamples::with_capacity(trials);
    for chunk in chunks {
        all.growth.extend(chunk.growth);
        all.fcf.extend(chunk.fcf);
        all.npv.extend(chunk.npv);
        all.revenue.extend(chunk.revenue);
        all.ebitda.extend(chunk.ebitda);
    }

    let sorted_npv = stats::sorted(&all.npv);
    let results = SimulationResults {
        median_npv: stats::median_sorted(&sorted_npv),
        median_revenue: stats::median(&all.revenue),
        median_ebitda: stats::median(&all.ebitda),
        median_fcf: stats::median(&all.fcf),
        p10_npv: stats::percentile_sorted(&sorted_npv, 10.0),
        p90_npv: stats::percentile_sorted(&sorted_npv, 90.0),
        revenue_growth_dist: all.growth,
        cash_flow_dist: all.fcf,
        npv_dist: all.npv,
        assumption_log: assumption_log(baseline, deltas, config, &dcf, &mean_inputs, anchor.tax_rate),
        trials,
        seed: config.seed(),
    };

    debug!(
        median_npv = results.median_npv,
        p10_npv = results.p10_npv,
        p90_npv = results.p90_npv,
        "Monte Carlo simulation finished"
    );
    Ok(results)
}

fn run_chunk(
    baseline: &FinancialReport,
    mean: &ProjectionInputs,
    projection: &ProjectionAssumptions,
    dcf: &DcfAssumptions,
    config: &SimulationConfig,
    mut rng: SimRng,
    range: std::ops::Range<usize>,
) -> Result<ChunkSamples, SimulationError> {
    let mut out = ChunkSamples::with_capacity(range.len());
    for trial in range {
        // Draw order is fixed: growth, opex, rate.
        let inputs = ProjectionInputs {
            revenue_growth: rng.gen_normal_with(mean.revenue_growth, config.revenue_growth_std()),
            opex_delta: rng.gen_normal_with(mean.opex_delta, config.opex_std()),
            discount_rate_delta: rng.gen_normal_with(mean.discount_rate_delta, config.discount_rate_std()),
        };
        let statement = project(baseline, &inputs, projection)?;
        let rate = statement.discount_rate;
        if rate <= 0.0 {
            return Err(SimulationError::NonPositiveDiscountRate {
                trial: Some(trial),
                rate,
            });
        }

        out.growth.push(inputs.revenue_growth);
        out.fcf.push(statement.free_cash_flow);
        out.npv.push(dcf.npv(statement.free_cash_flow, inputs.revenue_growth, rate));
        out.revenue.push(statement.revenue);
        out.ebitda.push(statement.ebitda);
    }
    Ok(out)
}

fn pct(x: f64) -> String {
    format!("{:.2}%", x * 100.0)
}

fn assumption_log(
    baseline: &FinancialReport,
    deltas: &ScenarioDeltas,
    config: &SimulationConfig,
    dcf: &DcfAssumptions,
    mean: &ProjectionInputs,
    tax_rate: f64,
) -> Vec<String> {
    let effective_rate = config.base_discount_rate() + mean.discount_rate_delta;
    let tax_source = if baseline.tax_rate().is_some() {
        "report KPI TaxRate"
    } else {
        "default assumption"
    };
    let seed_line = match config.seed() {
        Some(seed) => format!("Random seed {seed}: run is reproducible"),
        None => "No seed supplied: run is non-reproducible and results vary between invocations"
            .to_string(),
    };

    vec![
        format!(
            "DCF model: {}-year explicit horizon with Gordon Growth terminal value (g = {})",
            dcf.horizon_years,
            pct(dcf.terminal_growth)
        ),
        format!(
            "Discount rate (WACC): base {} with {} bps delta, effective {}",
            pct(config.base_discount_rate()),
            deltas.discount_rate_delta_bps,
            pct(effective_rate)
        ),
        format!(
            "Applied mean revenue growth delta of {} bps and OpEx delta of {} bps",
            deltas.revenue_growth_delta_bps, deltas.opex_delta_bps
        ),
        format!(
            "Revenue growth sampled per trial as Normal(mean = {}, sd = {})",
            pct(mean.revenue_growth),
            pct(config.revenue_growth_std())
        ),
        format!(
            "OpEx delta sampled per trial as Normal(mean = {}, sd = {})",
            pct(mean.opex_delta),
            pct(config.opex_std())
        ),
        format!(
            "Discount rate sampled per trial as Normal(mean = {}, sd = {}); non-positive samples fail the run",
            pct(effective_rate),
            pct(config.discount_rate_std())
        ),
        format!(
            "Terminal value rate floored at terminal growth + {} = {}",
            pct(dcf.min_rate_spread),
            pct(dcf.terminal_growth + dcf.min_rate_spread)
        ),
        format!(
            "Gross margin held at baseline {}, D&A fixed, CapEx and working capital scale with revenue",
            pct(baseline.gross_margin())
        ),
        format!("Tax rate {} from {tax_source}, applied to positive EBIT only", pct(tax_rate)),
        format!(
            "Monte Carlo simulation ran {} trials with normal distributions",
            config.trials()
        ),
        seed_line,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(seed: u64) -> SimulationConfig {
        SimulationConfig::builder().trials(2_500).seed(seed).build().unwrap()
    }

    #[test]
    fn test_chunked_lengths_for_partial_last_chunk() {
        let report = FinancialReport::sample();
        let results = simulate(&report, &ScenarioDeltas::default(), &small_config(1)).unwrap();
        assert_eq!(results.npv_dist.len(), 2_500);
        assert_eq!(results.cash_flow_dist.len(), 2_500);
        assert_eq!(results.revenue_growth_dist.len(), 2_500);
        assert_eq!(results.trials, 2_500);
    }

    #[test]
    fn test_progress_reaches_one() {
        let report = FinancialReport::sample();
        let seen = Arc::new(std::sync::Mutex::new(Vec::<f64>::new()));
        let sink = Arc::clone(&seen);
        let progress: Arc<ProgressFn> = Arc::new(move |f: f64| sink.lock().unwrap().push(f));
        let hooks = SimulationHooks {
            progress: Some(progress),
            cancel: None,
        };
        simulate_with(&report, &ScenarioDeltas::default(), &small_config(2), &hooks).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().any(|f| (*f - 1.0).abs() < 1e-12));
        assert!(seen.iter().all(|f| *f > 0.0 && *f <= 1.0));
    }

    #[test]
    fn test_cancel_flag_aborts() {
        let report = FinancialReport::sample();
        let hooks = SimulationHooks {
            progress: None,
            cancel: Some(Arc::new(AtomicBool::new(true))),
        };
        let err = simulate_with(&report, &ScenarioDeltas::default(), &small_config(3), &hooks).unwrap_err();
        assert_eq!(err, SimulationError::Cancelled);
    }

    #[test]
    fn test_unperturbed_rate_must_be_positive() {
        let report = FinancialReport::sample();
        let err = simulate(&report, &ScenarioDeltas::new(0, 0, -800), &small_config(4)).unwrap_err();
        assert!(matches!(err, SimulationError::NonPositiveDiscountRate { trial: None, .. }));
    }

    #[test]
    fn test_assumption_log_documents_run() {
        let report = FinancialReport::sample();
        let results = simulate(&report, &ScenarioDeltas::new(200, -100, -50), &small_config(5)).unwrap();
        let log = results.assumption_log.join("\n");
        assert!(log.contains("5-year explicit horizon"));
        assert!(log.contains("g = 2.00%"));
        assert!(log.contains("effective 7.50%"));
        assert!(log.contains("Random seed 5"));

        let unseeded = SimulationConfig::builder().trials(10).build().unwrap();
        let results = simulate(&report, &ScenarioDeltas::default(), &unseeded).unwrap();
        assert!(results.seed.is_none());
        assert!(results
            .assumption_log
            .iter()
            .any(|line| line.contains("non-reproducible")));
    }
}
