//! `fusion_core` — Laser/radar fusion Extended Kalman Filter.
//!
//! # Module layout
//! - [`types`]   — Fundamental types (state, measurements, estimates)
//! - [`error`]   — Typed rejection reasons
//! - [`config`]  — Noise and initial-uncertainty configuration
//! - [`kf`]      — Kalman filter (predict / linear update)
//! - [`ekf`]     — Extended Kalman filter update with a precomputed Jacobian
//! - [`fusion`]  — `FusionEkf`, the per-target estimator
//! - [`metrics`] — RMSE against ground truth

pub mod config;
pub mod ekf;
pub mod error;
pub mod fusion;
pub mod kf;
pub mod metrics;
pub mod types;

pub use config::FusionConfig;
pub use error::FusionError;
pub use fusion::{FilterPhase, FusionEkf, StepDiagnostics};
pub use metrics::RmseAccumulator;
pub use types::{
    Estimate, MeasurementPackage, SensorKind, SensorReading, StateCov, StateVec,
};
