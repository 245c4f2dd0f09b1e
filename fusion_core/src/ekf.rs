//! Extended Kalman Filter (EKF) implementation.
//!
//! Unlike the standard KF, the EKF linearizes non-linear observation models
//! by computing the Jacobian at the current state estimate.

use crate::error::FusionError;
use crate::kf::{correct, CvKalmanFilter, CvKfConfig, KalmanFilter, KfUpdateResult};
use crate::types::{state_array, DMat, DVec, StateCov, StateVec};
use sensor_models::ObservationModel;

/// Extended Kalman Filter implementation.
/// It reuses the Constant Velocity prediction from CvKalmanFilter but
/// supports non-linear updates.
#[derive(Clone, Debug)]
pub struct ExtendedKalmanFilter {
    pub cv_kf: CvKalmanFilter,
}

impl ExtendedKalmanFilter {
    pub fn new(config: CvKfConfig) -> Self {
        Self {
            cv_kf: CvKalmanFilter::new(config),
        }
    }

    /// Update step for EKF.
    /// `z` is the measurement.
    /// `model` supplies h(x), the Jacobian H at x_pred and the residual
    /// (which wraps angular components).
    /// `r` is the measurement noise covariance.
    pub fn update_ekf<M: ObservationModel>(
        &self,
        state: &StateVec,
        cov: &StateCov,
        z: &DVec,
        model: &M,
        r: &DMat,
    ) -> Result<KfUpdateResult, FusionError> {
        let x = state_array(state);
        let hx = model.apply(&x);
        let h_jacobian = model.h_matrix(&x);

        // Innovation: ν = z − h(x)
        let innovation = model.residual(z, &hx);

        correct(state, cov, innovation, &h_jacobian, r)
    }
}

impl KalmanFilter for ExtendedKalmanFilter {
    fn predict(
        &self,
        state: &StateVec,
        cov: &StateCov,
        f: &StateCov,
        q: &StateCov,
    ) -> (StateVec, StateCov) {
        self.cv_kf.predict(state, cov, f, q)
    }

    /// Linear observations go straight through the CV filter; no residual
    /// wrapping is applied.
    fn update(
        &self,
        state: &StateVec,
        cov: &StateCov,
        z: &DVec,
        h: &DMat,
        r: &DMat,
    ) -> Result<KfUpdateResult, FusionError> {
        self.cv_kf.update(state, cov, z, h, r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::Vector4;
    use sensor_models::{RadarObservation, RadarParams};
    use std::f64::consts::PI;

    fn radar() -> RadarObservation {
        RadarObservation::new(RadarParams::default())
    }

    #[test]
    fn test_ekf_polar_update() {
        let ekf = ExtendedKalmanFilter::new(CvKfConfig::default());
        let model = radar();
        let state = Vector4::new(100.0, 0.0, 0.0, 0.0);
        let cov = StateCov::identity() * 10.0;

        // Polar measurement at [105, 0.01, 0]
        let z = DVec::from_vec(vec![105.0, 0.01, 0.0]);
        let res = ekf
            .update_ekf(&state, &cov, &z, &model, &model.r_matrix())
            .unwrap();

        // x should increase towards 105
        assert!(res.state[0] > 100.0);
        // y should increase towards something small positive due to bearing 0.01
        assert!(res.state[1] > 0.0);
        assert!(res.cov.trace() < cov.trace());
        assert_abs_diff_eq!(res.innovation[0], 5.0, epsilon = 1e-9);
    }

    #[test]
    fn bearing_residual_is_wrapped() {
        let ekf = ExtendedKalmanFilter::new(CvKfConfig::default());
        let model = radar();
        // Predicted bearing just above −π
        let state = Vector4::new(-100.0, -5.0, 0.0, 0.0);
        let cov = StateCov::identity();
        let half_gap = (0.05f64).atan();

        // Measured just below +π: naive difference ≈ 2π
        let range = (100.0f64 * 100.0 + 25.0).sqrt();
        let z = DVec::from_vec(vec![range, PI - half_gap, 0.0]);

        let res = ekf
            .update_ekf(&state, &cov, &z, &model, &model.r_matrix())
            .unwrap();
        assert_abs_diff_eq!(res.innovation[1], -2.0 * half_gap, epsilon = 1e-9);
        assert!(res.innovation[1] > -PI && res.innovation[1] <= PI);
    }

    #[test]
    fn linear_update_is_not_wrapped() {
        let ekf = ExtendedKalmanFilter::new(CvKfConfig::default());
        let state = Vector4::new(0.0, 0.0, 0.0, 0.0);
        let cov = StateCov::identity();
        let h = DMat::from_row_slice(2, 4, &[1., 0., 0., 0., 0., 1., 0., 0.]);
        let r = DMat::identity(2, 2);
        let z = DVec::from_vec(vec![0.0, 10.0]);

        let res = ekf.update(&state, &cov, &z, &h, &r).unwrap();
        assert_abs_diff_eq!(res.innovation[1], 10.0, epsilon = 1e-12);
    }
}
