//! Error types for the fusion filter.

use crate::types::SensorKind;
use thiserror::Error;

/// Reasons a measurement can be rejected by the filter.
///
/// A rejected measurement never changes the estimator: state, covariance and
/// the last processed timestamp stay as they were.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FusionError {
    /// Raw value list has the wrong length for its sensor type
    #[error("Malformed {sensor} measurement: expected {expected} values, got {got}")]
    MalformedMeasurement {
        sensor: SensorKind,
        expected: usize,
        got: usize,
    },

    /// A raw value is NaN or infinite
    #[error("Non-finite value in {sensor} measurement")]
    NonFiniteMeasurement { sensor: SensorKind },

    /// Measurement is older than the last processed one
    #[error("Timestamp went backwards: {current}µs is before {previous}µs")]
    NonMonotonicTimestamp { previous: i64, current: i64 },

    /// Gap between timestamps does not fit in an `i64` of microseconds
    #[error("Timestamp gap from {previous}µs to {current}µs overflows")]
    TimestampOverflow { previous: i64, current: i64 },

    /// Innovation covariance S = H·P·Hᵀ + R could not be inverted
    #[error("Innovation covariance is singular")]
    SingularInnovation,
}
