//! Kalman filter: predict and update steps.
//!
//! # Design choices
//! - The motion model is a **linear** constant-velocity (CV) model.
//! - All math is done in `f64` via `nalgebra` for numerical stability.
//! - Observation matrices are dynamic-size so the same update serves the 2-D
//!   laser and the 3-D radar observation.
//!
//! ## State vector
//! x = [px, py, vx, vy]ᵀ  (4-dimensional)
//!
//! ## CV Transition model
//! F = I₄ + dt * [[0₂ I₂]; [0₂ 0₂]]
//! i.e. px += vx*dt, py += vy*dt
//!
//! ## Process noise Q (discrete white noise acceleration)
//! per axis, with acceleration variance σ²:
//! [[dt⁴/4, dt³/2], [dt³/2, dt²]] · σ²

use crate::error::FusionError;
use crate::types::{DMat, DVec, StateCov, StateVec};
use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Trait for a Kalman filter model (predict + update).
pub trait KalmanFilter {
    /// Propagate state and covariance through the transition `f` with
    /// process noise `q`: x' = F·x, P' = F·P·Fᵀ + Q.
    fn predict(
        &self,
        state: &StateVec,
        cov: &StateCov,
        f: &StateCov,
        q: &StateCov,
    ) -> (StateVec, StateCov);

    /// Update state and covariance given an observation `z`, observation
    /// matrix `H` and measurement noise `R`.
    fn update(
        &self,
        state: &StateVec,
        cov: &StateCov,
        z: &DVec,
        h: &DMat,
        r: &DMat,
    ) -> Result<KfUpdateResult, FusionError>;
}

/// Result of a KF update step.
#[derive(Clone, Debug)]
pub struct KfUpdateResult {
    pub state: StateVec,
    pub cov: StateCov,
    /// Innovation ν = z − H·x
    pub innovation: DVec,
    /// Innovation covariance S = H·P·Hᵀ + R
    pub innovation_cov: DMat,
}

/// Correct `state`/`cov` with an already computed innovation.
///
/// Shared by the linear and the linearised update: only the way ν and H are
/// obtained differs between the two.
pub(crate) fn correct(
    state: &StateVec,
    cov: &StateCov,
    innovation: DVec,
    h: &DMat,
    r: &DMat,
) -> Result<KfUpdateResult, FusionError> {
    let n = state.len();
    let p_dyn = DMat::from_column_slice(n, n, cov.as_slice());

    // Innovation covariance: S = H·P·Hᵀ + R
    let hp = h * &p_dyn;
    let s = &hp * h.transpose() + r;

    // Kalman gain: K = P·Hᵀ·S⁻¹  (LU for numerical stability)
    let s_inv = s
        .clone()
        .lu()
        .try_inverse()
        .ok_or(FusionError::SingularInnovation)?;
    let k = &p_dyn * h.transpose() * &s_inv;

    // Updated state: x' = x + K·ν
    let state_update = &k * &innovation;
    let new_state = StateVec::from_fn(|r, _| state[r] + state_update[r]);

    // Updated covariance: Joseph form P' = (I−KH)·P·(I−KH)ᵀ + K·R·Kᵀ
    let kh = &k * h;
    let i_kh = DMat::identity(n, n) - kh;
    let new_p_dyn = &i_kh * &p_dyn * i_kh.transpose() + &k * r * k.transpose();
    let new_cov = StateCov::from_fn(|r, c| new_p_dyn[(r, c)]);

    Ok(KfUpdateResult {
        state: new_state,
        cov: new_cov,
        innovation,
        innovation_cov: s,
    })
}

// ---------------------------------------------------------------------------
// Constant Velocity model
// ---------------------------------------------------------------------------

/// Configuration for the CV Kalman filter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CvKfConfig {
    /// Acceleration noise variance along x (m²/s⁴).
    /// Higher = more maneuvering allowed.
    pub noise_ax: f64,
    /// Acceleration noise variance along y (m²/s⁴).
    pub noise_ay: f64,
}

impl Default for CvKfConfig {
    fn default() -> Self {
        Self {
            noise_ax: 9.0,
            noise_ay: 9.0,
        }
    }
}

/// Constant-Velocity Kalman filter (4-state, linear).
#[derive(Clone, Debug)]
pub struct CvKalmanFilter {
    pub config: CvKfConfig,
}

impl CvKalmanFilter {
    pub fn new(config: CvKfConfig) -> Self {
        Self { config }
    }

    /// Build state transition matrix F for timestep dt.
    pub fn transition_matrix(dt: f64) -> Matrix4<f64> {
        let mut f = Matrix4::<f64>::identity();
        // position += velocity * dt
        f[(0, 2)] = dt;
        f[(1, 3)] = dt;
        f
    }

    /// Build process noise matrix Q for timestep dt.
    /// Uses discrete white noise acceleration model (DWNA); x and y are
    /// uncoupled.
    pub fn process_noise(&self, dt: f64) -> Matrix4<f64> {
        let dt2 = dt * dt;
        let dt3 = dt2 * dt;
        let dt4 = dt3 * dt;

        let mut qm = Matrix4::<f64>::zeros();
        for (i, q) in [self.config.noise_ax, self.config.noise_ay]
            .into_iter()
            .enumerate()
        {
            qm[(i, i)] = q * dt4 / 4.0;
            qm[(i + 2, i + 2)] = q * dt2;
            qm[(i, i + 2)] = q * dt3 / 2.0;
            qm[(i + 2, i)] = q * dt3 / 2.0;
        }
        qm
    }
}

impl KalmanFilter for CvKalmanFilter {
    fn predict(
        &self,
        state: &StateVec,
        cov: &StateCov,
        f: &StateCov,
        q: &StateCov,
    ) -> (StateVec, StateCov) {
        let predicted_state = f * state;
        let predicted_cov = f * cov * f.transpose() + q;
        (predicted_state, predicted_cov)
    }

    fn update(
        &self,
        state: &StateVec,
        cov: &StateCov,
        z: &DVec,
        h: &DMat,
        r: &DMat,
    ) -> Result<KfUpdateResult, FusionError> {
        // Convert fixed-size state to dynamic for DMat multiplication
        let x_dyn = DVec::from_iterator(state.len(), state.iter().copied());

        // Innovation: ν = z − H·x
        let hx = h * &x_dyn;
        let innovation = z - hx;

        correct(state, cov, innovation, h, r)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::Vector4;

    fn laser_h() -> DMat {
        DMat::from_row_slice(2, 4, &[1., 0., 0., 0., 0., 1., 0., 0.])
    }

    #[test]
    fn predict_constant_velocity() {
        let kf = CvKalmanFilter::new(CvKfConfig::default());
        // Object at (0,0) moving at (10,0) m/s
        let state = Vector4::new(0.0, 0.0, 10.0, 0.0);
        let cov = StateCov::identity();

        let f = CvKalmanFilter::transition_matrix(1.0);
        let q = kf.process_noise(1.0);
        let (pred_state, _pred_cov) = kf.predict(&state, &cov, &f, &q);
        assert_abs_diff_eq!(pred_state[0], 10.0, epsilon = 1e-9); // x moved
        assert_abs_diff_eq!(pred_state[2], 10.0, epsilon = 1e-9); // vx unchanged
    }

    #[test]
    fn process_noise_blocks() {
        let kf = CvKalmanFilter::new(CvKfConfig {
            noise_ax: 9.0,
            noise_ay: 4.0,
        });
        let q = kf.process_noise(2.0);
        assert_abs_diff_eq!(q[(0, 0)], 16.0 / 4.0 * 9.0, epsilon = 1e-12);
        assert_abs_diff_eq!(q[(0, 2)], 8.0 / 2.0 * 9.0, epsilon = 1e-12);
        assert_abs_diff_eq!(q[(2, 2)], 4.0 * 9.0, epsilon = 1e-12);
        assert_abs_diff_eq!(q[(1, 1)], 16.0 / 4.0 * 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(q[(3, 1)], 8.0 / 2.0 * 4.0, epsilon = 1e-12);
        // no cross-axis coupling
        assert_eq!(q[(0, 1)], 0.0);
        assert_eq!(q[(0, 3)], 0.0);
        assert_eq!(q[(2, 3)], 0.0);
        assert_eq!(q, q.transpose());
    }

    #[test]
    fn zero_dt_is_identity() {
        let kf = CvKalmanFilter::new(CvKfConfig::default());
        assert_eq!(CvKalmanFilter::transition_matrix(0.0), Matrix4::identity());
        assert_eq!(kf.process_noise(0.0), Matrix4::zeros());
    }

    #[test]
    fn update_reduces_uncertainty() {
        let kf = CvKalmanFilter::new(CvKfConfig::default());
        let state = Vector4::new(100.0, 50.0, 5.0, 2.0);
        let cov = StateCov::identity() * 100.0;

        let r = DMat::from_diagonal(&DVec::from_vec(vec![9.0, 9.0])); // 3m std dev
        let z = DVec::from_vec(vec![101.0, 51.0]);

        let res = kf.update(&state, &cov, &z, &laser_h(), &r).unwrap();
        // Posterior covariance trace must be less than prior
        assert!(res.cov.trace() < cov.trace(), "Update should reduce uncertainty");
        assert!(res.state[0] > 100.0 && res.state[0] < 101.0);
        assert_abs_diff_eq!(res.innovation[0], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn singular_innovation_is_reported() {
        let kf = CvKalmanFilter::new(CvKfConfig::default());
        let state = Vector4::zeros();
        let cov = StateCov::zeros();
        let r = DMat::zeros(2, 2);
        let z = DVec::from_vec(vec![1.0, 1.0]);
        assert!(matches!(
            kf.update(&state, &cov, &z, &laser_h(), &r),
            Err(FusionError::SingularInnovation)
        ));
    }
}
