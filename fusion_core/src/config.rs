//! Filter configuration: sensor noise, process noise and initial uncertainty.

use crate::kf::CvKfConfig;
use crate::types::StateCov;
use nalgebra::Vector4;
use sensor_models::{LaserParams, RadarParams};
use serde::{Deserialize, Serialize};

/// Configuration for [`FusionEkf`](crate::fusion::FusionEkf).
///
/// Every field has a default, so a JSON file only needs the values it
/// overrides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Laser noise characteristics (R = diag(σx², σy²))
    pub laser: LaserParams,
    /// Radar noise characteristics (R = diag(σρ², σφ², σρ̇²))
    pub radar: RadarParams,
    /// Acceleration noise variance along x (m²/s⁴)
    pub noise_ax: f64,
    /// Acceleration noise variance along y (m²/s⁴)
    pub noise_ay: f64,
    /// Initial variance of px and py (m²)
    pub initial_position_variance: f64,
    /// Initial variance of vx and vy (m²/s²); large because the first fix
    /// says nothing about velocity
    pub initial_velocity_variance: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            laser: LaserParams::default(),
            radar: RadarParams::default(),
            noise_ax: 9.0,
            noise_ay: 9.0,
            initial_position_variance: 1.0,
            initial_velocity_variance: 1000.0,
        }
    }
}

impl FusionConfig {
    pub fn kf_config(&self) -> CvKfConfig {
        CvKfConfig {
            noise_ax: self.noise_ax,
            noise_ay: self.noise_ay,
        }
    }

    /// Diagonal initial state covariance P₀.
    pub fn initial_covariance(&self) -> StateCov {
        StateCov::from_diagonal(&Vector4::new(
            self.initial_position_variance,
            self.initial_position_variance,
            self.initial_velocity_variance,
            self.initial_velocity_variance,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_initial_covariance() {
        let p0 = FusionConfig::default().initial_covariance();
        assert_eq!(p0[(0, 0)], 1.0);
        assert_eq!(p0[(1, 1)], 1.0);
        assert_eq!(p0[(2, 2)], 1000.0);
        assert_eq!(p0[(3, 3)], 1000.0);
        assert_eq!(p0[(0, 2)], 0.0);
    }

    #[test]
    fn kf_config_carries_noise() {
        let cfg = FusionConfig {
            noise_ax: 2.0,
            noise_ay: 3.0,
            ..Default::default()
        };
        assert_eq!(cfg.kf_config(), CvKfConfig { noise_ax: 2.0, noise_ay: 3.0 });
    }
}
