//! Radar sensor parameters.

use serde::{Deserialize, Serialize};

/// Noise and timing characteristics of a radar sensor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadarParams {
    /// Measurement noise: range standard deviation (meters)
    pub sigma_range: f64,
    /// Measurement noise: bearing standard deviation (radians)
    pub sigma_bearing: f64,
    /// Measurement noise: range-rate standard deviation (m/s)
    pub sigma_range_rate: f64,
    /// Update rate (Hz) — average time between scans = 1.0 / refresh_rate
    pub refresh_rate: f64,
}

impl Default for RadarParams {
    fn default() -> Self {
        Self {
            sigma_range: 0.3,       // 0.09 m² variance
            sigma_bearing: 0.03,    // ~1.7°
            sigma_range_rate: 0.3,
            refresh_rate: 10.0,
        }
    }
}
