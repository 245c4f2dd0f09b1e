//! Observation models: H matrix, R matrix, polar↔cartesian conversion, Jacobians.
//!
//! # Measurement types supported
//! - **Laser**: z = [px, py], H is a constant 2×4 matrix
//! - **Radar**: z = [range, bearing, range_rate], H is the Jacobian at x̂
//!
//! All models act on the 4-state `[px, py, vx, vy]`.

use crate::laser::LaserParams;
use crate::radar::RadarParams;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

pub type DMat = DMatrix<f64>;
pub type DVec = DVector<f64>;

/// Dimension of the state the observation models act on.
pub const STATE_DIM: usize = 4;

/// Smallest range used when linearising the radar model. Below this the
/// target is treated as sitting this far from the sensor.
pub const MIN_RANGE: f64 = 1e-4;

/// Wrap an angle into (−π, π].
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Trait for a sensor observation model.
pub trait ObservationModel {
    /// Observation matrix H (linear approx. at `state`)
    fn h_matrix(&self, state: &[f64; STATE_DIM]) -> DMat;
    /// Measurement noise covariance R
    fn r_matrix(&self) -> DMat;
    /// Map state to expected measurement h(x)
    fn apply(&self, state: &[f64; STATE_DIM]) -> DVec;
    /// Residual z − h(x) in observation space.
    fn residual(&self, z: &DVec, hx: &DVec) -> DVec {
        z - hx
    }
}

// ---------------------------------------------------------------------------
// Laser
// ---------------------------------------------------------------------------

/// Laser observation model: position measured directly in the state frame.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LaserObservation {
    pub params: LaserParams,
}

impl LaserObservation {
    pub fn new(params: LaserParams) -> Self {
        Self { params }
    }
}

impl ObservationModel for LaserObservation {
    fn h_matrix(&self, _state: &[f64; STATE_DIM]) -> DMat {
        // Linear: z = [px, py]
        DMatrix::from_row_slice(2, STATE_DIM, &[
            1., 0., 0., 0.,
            0., 1., 0., 0.,
        ])
    }

    fn r_matrix(&self) -> DMat {
        DMatrix::from_diagonal(&DVector::from_vec(vec![
            self.params.sigma_x * self.params.sigma_x,
            self.params.sigma_y * self.params.sigma_y,
        ]))
    }

    fn apply(&self, state: &[f64; STATE_DIM]) -> DVec {
        DVector::from_vec(vec![state[0], state[1]])
    }
}

// ---------------------------------------------------------------------------
// Radar (range + bearing + range rate)
// ---------------------------------------------------------------------------

/// Polar observation model for a radar located at the origin of the state
/// frame. Bearing is measured counter-clockwise from the +x axis.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RadarObservation {
    pub params: RadarParams,
}

impl RadarObservation {
    /// Index of the bearing component in the observation vector.
    pub const BEARING: usize = 1;

    pub fn new(params: RadarParams) -> Self {
        Self { params }
    }

    /// Convert polar [range, bearing] to cartesian [x, y].
    pub fn polar_to_cartesian(range: f64, bearing: f64) -> (f64, f64) {
        (range * bearing.cos(), range * bearing.sin())
    }

    /// Compute [range, bearing, range_rate] from a state vector.
    ///
    /// At the origin the bearing is 0 and the range rate is taken as 0.
    pub fn state_to_polar(state: &[f64; STATE_DIM]) -> (f64, f64, f64) {
        let [px, py, vx, vy] = *state;
        let range = (px * px + py * py).sqrt();
        let bearing = py.atan2(px);
        let range_rate = if range < MIN_RANGE {
            0.0
        } else {
            (px * vx + py * vy) / range
        };
        (range, bearing, range_rate)
    }

    /// Jacobian of h = [range, bearing, range_rate] w.r.t. [px, py, vx, vy].
    ///
    /// The range is clamped to [`MIN_RANGE`] so the matrix stays finite when
    /// the target sits on the sensor.
    pub fn jacobian(state: &[f64; STATE_DIM]) -> DMat {
        let [px, py, vx, vy] = *state;
        let c1 = (px * px + py * py).max(MIN_RANGE * MIN_RANGE);
        let c2 = c1.sqrt();
        let c3 = c1 * c2;
        // (vx·py − vy·px) appears in both ∂ρ̇/∂px and ∂ρ̇/∂py
        let cross = vx * py - vy * px;

        DMatrix::from_row_slice(3, STATE_DIM, &[
            px / c2,              py / c2,              0.,      0.,
            -py / c1,             px / c1,              0.,      0.,
            py * cross / c3,      -px * cross / c3,     px / c2, py / c2,
        ])
    }
}

impl ObservationModel for RadarObservation {
    fn h_matrix(&self, state: &[f64; STATE_DIM]) -> DMat {
        Self::jacobian(state)
    }

    fn r_matrix(&self) -> DMat {
        DMatrix::from_diagonal(&DVector::from_vec(vec![
            self.params.sigma_range * self.params.sigma_range,
            self.params.sigma_bearing * self.params.sigma_bearing,
            self.params.sigma_range_rate * self.params.sigma_range_rate,
        ]))
    }

    fn apply(&self, state: &[f64; STATE_DIM]) -> DVec {
        let (range, bearing, range_rate) = Self::state_to_polar(state);
        DVector::from_vec(vec![range, bearing, range_rate])
    }

    fn residual(&self, z: &DVec, hx: &DVec) -> DVec {
        let mut y = z - hx;
        y[Self::BEARING] = normalize_angle(y[Self::BEARING]);
        y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn laser_h_shape() {
        let model = LaserObservation::new(LaserParams::default());
        let h = model.h_matrix(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!((h.nrows(), h.ncols()), (2, 4));
        assert_eq!(model.apply(&[1.0, 2.0, 3.0, 4.0]).as_slice(), &[1.0, 2.0]);
    }

    #[test]
    fn default_noise_matches_datasheet() {
        let laser = LaserObservation::new(LaserParams::default()).r_matrix();
        assert_abs_diff_eq!(laser[(0, 0)], 0.0225, epsilon = 1e-12);
        assert_abs_diff_eq!(laser[(1, 1)], 0.0225, epsilon = 1e-12);

        let radar = RadarObservation::new(RadarParams::default()).r_matrix();
        assert_abs_diff_eq!(radar[(0, 0)], 0.09, epsilon = 1e-12);
        assert_abs_diff_eq!(radar[(1, 1)], 0.0009, epsilon = 1e-12);
        assert_abs_diff_eq!(radar[(2, 2)], 0.09, epsilon = 1e-12);
        assert_eq!(radar[(0, 1)], 0.0);
    }

    #[test]
    fn polar_roundtrip() {
        let (r, az, rr) = RadarObservation::state_to_polar(&[0.0, 5.0, 0.0, 2.0]);
        assert_abs_diff_eq!(r, 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(az, FRAC_PI_2, epsilon = 1e-12);
        assert_abs_diff_eq!(rr, 2.0, epsilon = 1e-12);
        let (x, y) = RadarObservation::polar_to_cartesian(r, az);
        assert_abs_diff_eq!(x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(y, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn jacobian_matches_reference_values() {
        let hj = RadarObservation::jacobian(&[1.0, 2.0, 0.2, 0.4]);
        let expected = [
            0.447214, 0.894427, 0.0, 0.0,
            -0.4, 0.2, 0.0, 0.0,
            0.0, 0.0, 0.447214, 0.894427,
        ];
        for (got, want) in hj.transpose().iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*got, *want, epsilon = 1e-6);
        }
    }

    #[test]
    fn jacobian_matches_finite_differences() {
        let state = [3.0, -1.5, 0.7, 2.1];
        let hj = RadarObservation::jacobian(&state);
        let model = RadarObservation::new(RadarParams::default());
        let h = 1e-6;
        for col in 0..STATE_DIM {
            let mut plus = state;
            let mut minus = state;
            plus[col] += h;
            minus[col] -= h;
            let d = (model.apply(&plus) - model.apply(&minus)) / (2.0 * h);
            for row in 0..3 {
                assert_abs_diff_eq!(hj[(row, col)], d[row], epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn jacobian_at_origin_is_finite() {
        let hj = RadarObservation::jacobian(&[0.0, 0.0, 1.0, 1.0]);
        assert!(hj.iter().all(|v| v.is_finite()));
        let (_, _, rr) = RadarObservation::state_to_polar(&[0.0, 0.0, 1.0, 1.0]);
        assert_eq!(rr, 0.0);
    }

    #[test]
    fn angle_normalization_range() {
        assert_abs_diff_eq!(normalize_angle(2.5 * PI), 0.5 * PI, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_angle(-PI), PI, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_angle(PI), PI, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_angle(-3.0), -3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_angle(-3.5), -3.5 + TAU, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_angle(7.0), 7.0 - TAU, epsilon = 1e-12);
    }

    #[test]
    fn radar_residual_wraps_bearing() {
        let model = RadarObservation::new(RadarParams::default());
        let z = DVector::from_vec(vec![1.0, -3.0, 0.0]);
        let hx = DVector::from_vec(vec![1.0, 3.0, 0.0]);
        let y = model.residual(&z, &hx);
        // −6 rad wraps to 2π − 6
        assert_abs_diff_eq!(y[1], TAU - 6.0, epsilon = 1e-12);
        assert!(y[1] > -PI && y[1] <= PI);
    }
}
