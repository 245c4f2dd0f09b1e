//! Estimation accuracy metrics: per-component RMSE against ground truth.

use crate::types::StateVec;
use serde::{Deserialize, Serialize};

/// Running root-mean-square error of `[px, py, vx, vy]`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RmseAccumulator {
    /// Number of (estimate, ground truth) pairs accumulated
    pub n_samples: u64,
    /// Per-component sum of squared errors
    pub sum_sq_err: [f64; 4],
}

impl RmseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one estimate/ground-truth pair.
    pub fn accumulate(&mut self, estimate: &StateVec, ground_truth: &StateVec) {
        let err = estimate - ground_truth;
        for (sum, e) in self.sum_sq_err.iter_mut().zip(err.iter()) {
            *sum += e * e;
        }
        self.n_samples += 1;
    }

    /// Merge another accumulator into this one.
    pub fn merge(&mut self, other: &RmseAccumulator) {
        for (sum, o) in self.sum_sq_err.iter_mut().zip(other.sum_sq_err.iter()) {
            *sum += o;
        }
        self.n_samples += other.n_samples;
    }

    /// RMSE per state component; zeros when nothing was accumulated.
    pub fn rmse(&self) -> StateVec {
        if self.n_samples == 0 {
            return StateVec::zeros();
        }
        let n = self.n_samples as f64;
        StateVec::from_fn(|r, _| (self.sum_sq_err[r] / n).sqrt())
    }

    /// Root-mean-square position error (meters, 2D).
    pub fn rmse_position(&self) -> f64 {
        if self.n_samples == 0 {
            return 0.0;
        }
        ((self.sum_sq_err[0] + self.sum_sq_err[1]) / self.n_samples as f64).sqrt()
    }

    /// Root-mean-square velocity error (m/s, 2D).
    pub fn rmse_velocity(&self) -> f64 {
        if self.n_samples == 0 {
            return 0.0;
        }
        ((self.sum_sq_err[2] + self.sum_sq_err[3]) / self.n_samples as f64).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn empty_is_zero() {
        let acc = RmseAccumulator::new();
        assert_eq!(acc.rmse(), StateVec::zeros());
        assert_eq!(acc.rmse_position(), 0.0);
    }

    #[test]
    fn per_component_rmse() {
        let mut acc = RmseAccumulator::new();
        let truth = StateVec::new(1.0, 1.0, 0.2, 0.1);
        acc.accumulate(&StateVec::new(2.0, 1.0, 0.2, 0.1), &truth);
        acc.accumulate(&StateVec::new(0.0, 1.0, 0.2, 0.4), &truth);

        let rmse = acc.rmse();
        assert_abs_diff_eq!(rmse[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(rmse[1], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(rmse[3], (0.09f64 / 2.0).sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(acc.rmse_position(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn merge_matches_single_pass() {
        let truth = StateVec::zeros();
        let samples = [
            StateVec::new(1.0, 2.0, 3.0, 4.0),
            StateVec::new(-1.0, 0.5, 0.0, 2.0),
            StateVec::new(0.3, -0.2, 1.0, -1.0),
        ];
        let mut all = RmseAccumulator::new();
        let mut a = RmseAccumulator::new();
        let mut b = RmseAccumulator::new();
        for (i, s) in samples.iter().enumerate() {
            all.accumulate(s, &truth);
            if i == 0 { a.accumulate(s, &truth) } else { b.accumulate(s, &truth) }
        }
        a.merge(&b);
        assert_eq!(a.n_samples, 3);
        assert_abs_diff_eq!(a.rmse(), all.rmse(), epsilon = 1e-12);
    }
}
