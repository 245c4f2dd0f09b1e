//! Laser/radar fusion estimator.
//!
//! # Processing steps per measurement
//! 1. Validate the raw record (length, finiteness)
//! 2. First measurement: initialise position from it, velocity = 0, done
//! 3. Compute dt from the previous timestamp (µs → s); reject dt < 0
//! 4. Rebuild F and Q for dt and predict
//! 5. Update: linear KF for laser, EKF (Jacobian at x̂⁻) for radar
//! 6. Commit state, covariance, F, Q and timestamp together
//!
//! Nothing is written to the estimator before step 6, so a rejected
//! measurement leaves it exactly as it was.

use crate::{
    config::FusionConfig,
    ekf::ExtendedKalmanFilter,
    error::FusionError,
    kf::{CvKalmanFilter, KalmanFilter},
    types::{
        DMat, DVec, Estimate, MeasurementPackage, SensorReading, StateCov, StateVec,
        MICROS_PER_SECOND,
    },
};
use nalgebra::Vector4;
use sensor_models::{LaserObservation, ObservationModel, RadarObservation};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Lifecycle of the estimator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterPhase {
    /// No measurement processed yet; the state is meaningless.
    Uninitialized,
    /// State is populated; `last_timestamp` is the last accepted measurement.
    Tracking { last_timestamp: i64 },
}

/// Intermediate values of the last predict/update cycle.
#[derive(Clone, Debug)]
pub struct StepDiagnostics {
    /// Elapsed time used for the prediction (seconds)
    pub dt: f64,
    /// Prior x̂⁻ after prediction
    pub predicted_state: StateVec,
    /// Prior P⁻ after prediction
    pub predicted_cov: StateCov,
    /// Innovation ν (bearing already wrapped for radar)
    pub innovation: DVec,
    /// Innovation covariance S
    pub innovation_cov: DMat,
}

/// Extended Kalman filter fusing laser and radar measurements of one target.
#[derive(Clone, Debug)]
pub struct FusionEkf {
    config: FusionConfig,
    ekf: ExtendedKalmanFilter,
    radar: RadarObservation,
    /// Laser observation matrix H (2×4)
    h_laser: DMat,
    /// Laser measurement noise R (2×2)
    r_laser: DMat,
    /// Radar measurement noise R (3×3)
    r_radar: DMat,
    state: StateVec,
    cov: StateCov,
    /// State transition matrix F of the last cycle
    transition: StateCov,
    /// Process noise Q of the last cycle
    process_noise: StateCov,
    phase: FilterPhase,
    last_step: Option<StepDiagnostics>,
}

impl FusionEkf {
    /// Create an uninitialised estimator. All constant matrices are fixed here.
    pub fn new(config: FusionConfig) -> Self {
        let laser = LaserObservation::new(config.laser.clone());
        let radar = RadarObservation::new(config.radar.clone());
        let ekf = ExtendedKalmanFilter::new(config.kf_config());
        let zero = [0.0; 4];

        Self {
            h_laser: laser.h_matrix(&zero),
            r_laser: laser.r_matrix(),
            r_radar: radar.r_matrix(),
            cov: config.initial_covariance(),
            // unit-dt placeholder until the first real cycle
            transition: CvKalmanFilter::transition_matrix(1.0),
            process_noise: StateCov::zeros(),
            state: StateVec::zeros(),
            phase: FilterPhase::Uninitialized,
            last_step: None,
            config,
            ekf,
            radar,
        }
    }

    /// Feed one measurement through the filter.
    ///
    /// On error the estimator is left untouched.
    pub fn process(&mut self, measurement: &MeasurementPackage) -> Result<Estimate, FusionError> {
        let reading = measurement.reading().inspect_err(|e| {
            debug!(error = %e, "rejected measurement");
        })?;

        let last_timestamp = match self.phase {
            FilterPhase::Uninitialized => {
                self.initialize(&reading, measurement.timestamp);
                return Ok(self.estimate());
            }
            FilterPhase::Tracking { last_timestamp } => last_timestamp,
        };

        let elapsed = elapsed_micros(last_timestamp, measurement.timestamp).inspect_err(|e| {
            debug!(error = %e, "rejected measurement");
        })?;
        let dt = elapsed as f64 / MICROS_PER_SECOND;

        // ----------------------------------------------------------------
        // Predict
        // ----------------------------------------------------------------
        let transition = CvKalmanFilter::transition_matrix(dt);
        let process_noise = self.ekf.cv_kf.process_noise(dt);
        let (pred_state, pred_cov) =
            self.ekf
                .predict(&self.state, &self.cov, &transition, &process_noise);

        // ----------------------------------------------------------------
        // Update
        // ----------------------------------------------------------------
        let z = reading.to_vector();
        let result = match reading {
            SensorReading::Laser { .. } => {
                self.ekf
                    .update(&pred_state, &pred_cov, &z, &self.h_laser, &self.r_laser)
            }
            SensorReading::Radar { .. } => {
                self.ekf
                    .update_ekf(&pred_state, &pred_cov, &z, &self.radar, &self.r_radar)
            }
        }
        .inspect_err(|e| debug!(error = %e, sensor = %reading.sensor(), "update failed"))?;

        trace!(
            sensor = %reading.sensor(),
            dt,
            innovation = ?result.innovation.as_slice(),
            "fused measurement"
        );

        self.transition = transition;
        self.process_noise = process_noise;
        self.state = result.state;
        self.cov = result.cov;
        self.phase = FilterPhase::Tracking {
            last_timestamp: measurement.timestamp,
        };
        self.last_step = Some(StepDiagnostics {
            dt,
            predicted_state: pred_state,
            predicted_cov: pred_cov,
            innovation: result.innovation,
            innovation_cov: result.innovation_cov,
        });

        Ok(self.estimate())
    }

    /// Seed the state from the first measurement. Velocity is unobservable
    /// from a single fix and starts at zero; a radar's range rate is ignored.
    fn initialize(&mut self, reading: &SensorReading, timestamp: i64) {
        let (px, py) = reading.to_cartesian_2d();
        self.state = Vector4::new(px, py, 0.0, 0.0);
        self.phase = FilterPhase::Tracking {
            last_timestamp: timestamp,
        };
        debug!(sensor = %reading.sensor(), timestamp, px, py, "estimator initialised");
    }

    /// Drop the track and return to the uninitialised phase.
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    pub fn estimate(&self) -> Estimate {
        Estimate {
            timestamp: self.last_timestamp().unwrap_or_default(),
            state: self.state,
            cov: self.cov,
        }
    }

    pub fn state(&self) -> &StateVec {
        &self.state
    }

    pub fn covariance(&self) -> &StateCov {
        &self.cov
    }

    pub fn transition(&self) -> &StateCov {
        &self.transition
    }

    pub fn process_noise(&self) -> &StateCov {
        &self.process_noise
    }

    pub fn phase(&self) -> FilterPhase {
        self.phase
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.phase, FilterPhase::Tracking { .. })
    }

    pub fn last_timestamp(&self) -> Option<i64> {
        match self.phase {
            FilterPhase::Uninitialized => None,
            FilterPhase::Tracking { last_timestamp } => Some(last_timestamp),
        }
    }

    /// Diagnostics of the most recent predict/update cycle, if any.
    pub fn last_step(&self) -> Option<&StepDiagnostics> {
        self.last_step.as_ref()
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }
}

impl Default for FusionEkf {
    fn default() -> Self {
        Self::new(FusionConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// Microseconds from `previous` to `current`; never negative.
fn elapsed_micros(previous: i64, current: i64) -> Result<i64, FusionError> {
    if current < previous {
        return Err(FusionError::NonMonotonicTimestamp { previous, current });
    }
    current
        .checked_sub(previous)
        .ok_or(FusionError::TimestampOverflow { previous, current })
}
