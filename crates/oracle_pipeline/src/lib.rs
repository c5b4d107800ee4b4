//! # oracle_pipeline: Scenario Evaluation Pipeline
//!
//! ## Layer 4 (Pipeline) Role
//!
//! oracle_pipeline turns the stages of the lower layers into background jobs:
//! - `store`: the scenario state machine behind a single write lock
//! - `reports`: registered baseline reports
//! - `orchestrator`: [`ScenarioService`], which validates, claims and runs
//!   scenarios (Simulation → Critique → Debate) and serves status polls
//! - `cancel`: per-run cancellation and timeout signal
//! - `progress`: progress bands of the three stages
//! - `render`: report documents for completed scenarios
//!
//! ## Usage Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use oracle_agents::{CritiqueStage, DebateStage, RetryPolicy, ScriptedProvider};
//! use oracle_core::types::{CreateScenarioRequest, FinancialReport};
//! use oracle_pipeline::{PipelineConfig, ScenarioService};
//!
//! # async fn run() -> Result<(), oracle_pipeline::PipelineError> {
//! let critic = CritiqueStage::new(
//!     Arc::new(ScriptedProvider::always(r#"{"verdict":"approve","comparative_analysis":["ok"]}"#)),
//!     RetryPolicy::default(),
//! );
//! let analyst = Arc::new(ScriptedProvider::always("RECOMMENDATION: HOLD"));
//! let debate = DebateStage::new(analyst.clone(), analyst, RetryPolicy::default(), 4);
//! let service = ScenarioService::new(critic, debate, PipelineConfig::default());
//!
//! let report = service.reports().insert(FinancialReport::sample()).await;
//! let scenario = service
//!     .create_scenario(CreateScenarioRequest {
//!         report_id: report.id,
//!         revenue_growth_delta_bps: 200,
//!         opex_delta_bps: -100,
//!         discount_rate_delta_bps: -50,
//!     })
//!     .await?;
//! let status = service.get_scenario_status(scenario.id).await?;
//! println!("{} at {}%", status.status, status.progress);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod cancel;
pub mod error;
pub mod orchestrator;
pub mod progress;
pub mod render;
pub mod reports;
pub mod store;

pub use error::{PipelineError, RenderError, StageFailure, StoreError};
pub use orchestrator::{PipelineConfig, ScenarioService, DEFAULT_MAX_DELTA_BPS, DEFAULT_SCENARIO_TIMEOUT};
pub use render::{MarkdownRenderer, ReportRenderer};
pub use reports::{Registration, ReportRepository};
pub use store::ScenarioStore;
