//! # oracle_sim: Monte Carlo DCF Simulator
//!
//! ## Layer 2 (Simulation Kernel) Role
//!
//! oracle_sim turns a baseline report plus counterfactual deltas into a
//! distribution of net present values:
//! - Seeded, chunk-reproducible random streams (`rng`)
//! - Validated run configuration with documented defaults (`config`)
//! - Multi-year DCF valuation with a Gordon Growth terminal value (`dcf`)
//! - Parallel trial execution and aggregation (`simulator`)
//! - Order statistics (`stats`)
//!
//! ## Usage Examples
//!
//! ```rust
//! use oracle_core::types::{FinancialReport, ScenarioDeltas};
//! use oracle_sim::{simulate, SimulationConfig};
//!
//! let config = SimulationConfig::builder().trials(1_000).seed(42).build().unwrap();
//! let results = simulate(&FinancialReport::sample(), &ScenarioDeltas::new(200, -100, -50), &config).unwrap();
//!
//! assert_eq!(results.npv_dist.len(), 1_000);
//! assert!(results.p10_npv <= results.median_npv && results.median_npv <= results.p90_npv);
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod dcf;
pub mod error;
pub mod rng;
pub mod simulator;
pub mod stats;

pub use config::{SimulationConfig, SimulationConfigBuilder, DEFAULT_TRIALS, MAX_TRIALS};
pub use error::{ConfigError, SimulationError};
pub use simulator::{simulate, simulate_with, ProgressFn, SimulationHooks, CHUNK_SIZE};
