//! REST API server for the counterfactual scenario pipeline
//!
//! This crate exposes the scenario service over HTTP: baseline report
//! registration, scenario creation and status polling, cancellation and
//! rendered report documents.

pub mod config;
pub mod error;
pub mod routes;
pub mod server;
pub mod services;

// Re-export oracle dependencies for integration
pub use oracle_core;
pub use oracle_pipeline;

/// Server version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
