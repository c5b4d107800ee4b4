//! Error types for structured error handling.
//!
//! This module provides:
//! - `ProjectionError`: malformed baseline data detected by the projector
//! - `ValidationError`: bad scenario input rejected at creation time

use thiserror::Error;

use super::report::ReportId;

/// Malformed baseline detected while projecting a statement.
///
/// These are data errors, never retried.
///
/// # Examples
/// ```
/// use oracle_core::types::ProjectionError;
///
/// let err = ProjectionError::NonPositiveRevenue(0.0);
/// assert_eq!(err.to_string(), "Base revenue must be positive, got 0");
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    /// Baseline revenue is zero or negative.
    #[error("Base revenue must be positive, got {0}")]
    NonPositiveRevenue(f64),

    /// A required line item is NaN or infinite.
    #[error("Line item '{0}' is not a finite number")]
    NonFiniteLineItem(&'static str),

    /// Tax rate outside [0, 1).
    #[error("Tax rate must be in [0, 1), got {0}")]
    InvalidTaxRate(f64),
}

/// Scenario input rejected synchronously at creation.
///
/// A scenario failing validation never enters RUNNING.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No report is registered under the id.
    #[error("Unknown report id {0}")]
    UnknownReport(ReportId),

    /// A delta exceeds the configured bound.
    #[error("{name} = {value} bps is outside the allowed range of ±{bound} bps")]
    DeltaOutOfRange {
        /// Delta field name.
        name: &'static str,
        /// Offending value in bps.
        value: i32,
        /// Absolute bound in bps.
        bound: i32,
    },

    /// The unperturbed effective discount rate would be zero or negative.
    #[error("Effective discount rate {rate_bps} bps is not positive")]
    NonPositiveDiscountRate {
        /// Effective rate in bps.
        rate_bps: i32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::DeltaOutOfRange {
            name: "opex_delta_bps",
            value: 12_000,
            bound: 10_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("opex_delta_bps"));
        assert!(msg.contains("12000"));
    }
}
