//! Laser rangefinder parameters.

use serde::{Deserialize, Serialize};

/// Noise and timing characteristics of a laser rangefinder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaserParams {
    /// Std deviation in x (meters)
    pub sigma_x: f64,
    /// Std deviation in y (meters)
    pub sigma_y: f64,
    /// Update rate (Hz)
    pub refresh_rate: f64,
}

impl Default for LaserParams {
    fn default() -> Self {
        Self {
            sigma_x: 0.15, // 0.0225 m² variance
            sigma_y: 0.15,
            refresh_rate: 10.0,
        }
    }
}
