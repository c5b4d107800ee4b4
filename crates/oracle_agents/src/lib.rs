//! # oracle_agents: External Reasoning Stages
//!
//! ## Layer 3 (Agents) Role
//!
//! oracle_agents wraps calls to external reasoning models behind explicit
//! contracts:
//! - `provider`: the [`ReasoningProvider`] trait and an OpenAI-compatible HTTP client
//! - `retry`: the bounded [`RetryPolicy`] (per-attempt deadline, exponential back-off)
//! - `critic`: the approve/reject [`CritiqueStage`]
//! - `debate`: the multi-round Optimist vs Skeptic [`DebateStage`]
//! - `prompts` / `parse`: prompt construction and tolerant response parsing
//! - `scripted`: an in-memory provider for tests
//!
//! Credentials are injected through [`ProviderConfig`]; nothing here reads
//! environment variables or global state.
//!
//! ## Usage Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use oracle_agents::{CritiqueStage, HttpReasoningProvider, ProviderConfig, RetryPolicy};
//!
//! let provider = HttpReasoningProvider::new(ProviderConfig {
//!     name: "critic".to_string(),
//!     base_url: "https://api.openai.com/v1".to_string(),
//!     model: "gpt-4o-mini".to_string(),
//!     api_key: Some("sk-...".to_string()),
//!     temperature: 0.2,
//!     request_timeout: Duration::from_secs(60),
//! })
//! .unwrap();
//! let stage = CritiqueStage::new(Arc::new(provider), RetryPolicy::default());
//! ```

#![warn(missing_docs)]

pub mod critic;
pub mod debate;
pub mod error;
pub mod parse;
pub mod prompts;
pub mod provider;
pub mod retry;
pub mod scripted;

pub use critic::CritiqueStage;
pub use debate::{DebateStage, RoundProgressFn, DEFAULT_MAX_ROUNDS, MAX_ROUNDS_CAP};
pub use error::{ProviderError, StageError};
pub use provider::{HttpReasoningProvider, ProviderConfig, ReasoningProvider, ReasoningRequest};
pub use retry::RetryPolicy;
pub use scripted::ScriptedProvider;
