//! Statistical and reproducibility properties of the Monte Carlo simulator.
//!
//! # Test Categories
//!
//! 1. **Shape**: distribution lengths and median consistency
//! 2. **Reproducibility**: seeded replay, thread-count independence, seed tolerance
//! 3. **Economics**: monotonicity in the discount rate
//! 4. **Failures**: non-positive discount rates

use oracle_core::types::{FinancialReport, ScenarioDeltas};
use oracle_sim::stats::median;
use oracle_sim::{simulate, SimulationConfig, SimulationError};
use proptest::prelude::*;

fn seeded(trials: usize, seed: u64) -> SimulationConfig {
    SimulationConfig::builder().trials(trials).seed(seed).build().unwrap()
}

fn reference_deltas() -> ScenarioDeltas {
    ScenarioDeltas::new(200, -100, -50)
}

// ============================================================================
// Shape
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_distribution_lengths_equal_trials(trials in 1usize..3_000, seed in any::<u64>()) {
        let results = simulate(&FinancialReport::sample(), &reference_deltas(), &seeded(trials, seed)).unwrap();
        prop_assert_eq!(results.revenue_growth_dist.len(), trials);
        prop_assert_eq!(results.cash_flow_dist.len(), trials);
        prop_assert_eq!(results.npv_dist.len(), trials);
    }
}

#[test]
fn test_medians_match_returned_distributions() {
    for trials in [1, 2, 999, 1_000, 4_321] {
        let results = simulate(&FinancialReport::sample(), &reference_deltas(), &seeded(trials, 11)).unwrap();
        assert_eq!(results.median_npv, median(&results.npv_dist));
        assert_eq!(results.median_fcf, median(&results.cash_flow_dist));
        assert!(results.p10_npv <= results.median_npv);
        assert!(results.median_npv <= results.p90_npv);
    }
}

// ============================================================================
// Reproducibility
// ============================================================================

#[test]
fn test_seeded_runs_are_identical() {
    let report = FinancialReport::sample();
    let a = simulate(&report, &reference_deltas(), &seeded(10_000, 42)).unwrap();
    let b = simulate(&report, &reference_deltas(), &seeded(10_000, 42)).unwrap();
    assert_eq!(a.median_npv, b.median_npv);
    assert_eq!(a.npv_dist, b.npv_dist);
    assert_eq!(a.assumption_log, b.assumption_log);
}

#[test]
fn test_results_do_not_depend_on_thread_count() {
    let report = FinancialReport::sample();
    let config = seeded(5_500, 7);
    let run_on = |threads: usize| {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .unwrap()
            .install(|| simulate(&report, &reference_deltas(), &config).unwrap())
    };
    let single = run_on(1);
    let many = run_on(4);
    assert_eq!(single.npv_dist, many.npv_dist);
    assert_eq!(single.revenue_growth_dist, many.revenue_growth_dist);
}

#[test]
fn test_changing_seed_changes_samples_not_the_median() {
    let report = FinancialReport::sample();
    let a = simulate(&report, &reference_deltas(), &seeded(10_000, 42)).unwrap();
    let b = simulate(&report, &reference_deltas(), &seeded(10_000, 43)).unwrap();

    assert_ne!(a.npv_dist, b.npv_dist);
    let relative = (a.median_npv - b.median_npv).abs() / a.median_npv.abs();
    assert!(relative < 0.05, "median moved by {:.2}%", relative * 100.0);
}

// ============================================================================
// Economics
// ============================================================================

#[test]
fn test_higher_discount_rate_lowers_median_npv() {
    let report = FinancialReport::sample();
    let config = seeded(4_000, 2024);
    let medians: Vec<f64> = [-200, -50, 0, 100, 300]
        .iter()
        .map(|bps| {
            simulate(&report, &ScenarioDeltas::new(200, -100, *bps), &config)
                .unwrap()
                .median_npv
        })
        .collect();

    for pair in medians.windows(2) {
        assert!(pair[1] < pair[0], "{medians:?}");
    }
}

#[test]
fn test_revenue_growth_shifts_sampled_distribution() {
    let report = FinancialReport::sample();
    let config = seeded(4_000, 5);
    let flat = simulate(&report, &ScenarioDeltas::new(0, 0, 0), &config).unwrap();
    let growth = simulate(&report, &ScenarioDeltas::new(500, 0, 0), &config).unwrap();

    assert!((median(&flat.revenue_growth_dist) - 0.0).abs() < 0.002);
    assert!((median(&growth.revenue_growth_dist) - 0.05).abs() < 0.002);
    assert!(growth.median_revenue > flat.median_revenue);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_non_positive_effective_rate_fails() {
    let err = simulate(
        &FinancialReport::sample(),
        &ScenarioDeltas::new(0, 0, -1_000),
        &seeded(100, 1),
    )
    .unwrap_err();
    assert!(matches!(err, SimulationError::NonPositiveDiscountRate { trial: None, .. }));
}

#[test]
fn test_non_positive_sampled_rate_fails() {
    // effective rate 0.1% with 0.5% spread: many samples fall below zero
    let err = simulate(
        &FinancialReport::sample(),
        &ScenarioDeltas::new(0, 0, -790),
        &seeded(1_000, 1),
    )
    .unwrap_err();
    match err {
        SimulationError::NonPositiveDiscountRate { trial: Some(_), rate } => assert!(rate <= 0.0),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_malformed_baseline_fails() {
    let mut report = FinancialReport::sample();
    report.income_statement.revenue = -5.0;
    let err = simulate(&report, &reference_deltas(), &seeded(10, 1)).unwrap_err();
    assert!(matches!(err, SimulationError::Projection(_)));
}
