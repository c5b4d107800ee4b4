//! Error types for the Monte Carlo simulator.
//!
//! This module defines structured error types for configuration validation
//! and runtime failures of a simulation run.

use std::fmt;

use oracle_core::types::ProjectionError;
use thiserror::Error;

/// Configuration error for the simulator.
///
/// These errors occur at build time when invalid parameters are provided.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// Trial count outside valid range [1, 1_000_000].
    InvalidTrialCount(usize),
    /// Horizon outside valid range [1, 50] years.
    InvalidHorizon(u32),
    /// Invalid parameter value with name and description.
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Description of the invalid value.
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTrialCount(count) => {
                write!(f, "Invalid trial count {}: must be in range [1, 1_000_000]", count)
            }
            Self::InvalidHorizon(years) => {
                write!(f, "Invalid horizon {} years: must be in range [1, 50]", years)
            }
            Self::InvalidParameter { name, value } => {
                write!(f, "Invalid parameter '{}': {}", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Runtime failure of a simulation run. Fatal for the scenario, never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    /// The configuration was rejected.
    #[error("invalid simulation configuration: {0}")]
    Config(#[from] ConfigError),

    /// The baseline could not be projected.
    #[error("{0}")]
    Projection(#[from] ProjectionError),

    /// The unperturbed (`trial = None`) or a sampled discount rate is ≤ 0.
    #[error("{}", describe_rate(.trial, .rate))]
    NonPositiveDiscountRate {
        /// Trial index, `None` for the unperturbed rate.
        trial: Option<usize>,
        /// Offending rate (decimal).
        rate: f64,
    },

    /// The run was stopped through its cancellation flag.
    #[error("simulation cancelled")]
    Cancelled,
}

fn describe_rate(trial: &Option<usize>, rate: &f64) -> String {
    match trial {
        Some(t) => format!("sampled discount rate {:.4}% in trial {} is not positive", rate * 100.0, t),
        None => format!("effective discount rate {:.4}% is not positive", rate * 100.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidTrialCount(0);
        assert!(err.to_string().contains("Invalid trial count 0"));

        let err = ConfigError::InvalidParameter {
            name: "terminal_growth",
            value: "must be finite".to_string(),
        };
        assert!(err.to_string().contains("terminal_growth"));
    }

    #[test]
    fn test_rate_error_display() {
        let err = SimulationError::NonPositiveDiscountRate { trial: None, rate: -0.02 };
        assert!(err.to_string().contains("effective discount rate -2.0000%"));

        let err = SimulationError::NonPositiveDiscountRate { trial: Some(17), rate: 0.0 };
        assert!(err.to_string().contains("trial 17"));
    }

    #[test]
    fn test_projection_error_passes_through() {
        let err: SimulationError = ProjectionError::NonPositiveRevenue(0.0).into();
        assert!(err.to_string().starts_with("Base revenue must be positive"));
    }
}
