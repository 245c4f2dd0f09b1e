//! Target trajectory models and state propagation.
//!
//! Each target has a 2-D true state [px,py,vx,vy] and a `MotionSpec`
//! describing how it moves. The simulator steps each target forward in time.

use serde::{Deserialize, Serialize};

/// Describes target motion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum MotionSpec {
    /// Constant velocity: no acceleration. State propagates as CV.
    ConstantVelocity,
    /// Constant turn rate. `omega` = yaw rate (rad/s).
    ConstantTurn { omega: f64 },
    /// Constant acceleration model. `ax, ay` in m/s².
    ConstantAccel { ax: f64, ay: f64 },
    /// Segmented: switch motion model at given sim times.
    /// `segments` is sorted by time ascending: [(t_start, MotionSpec), ...].
    /// The active model is the last one whose t_start <= current_t.
    Segmented {
        segments: Vec<(f64, Box<MotionSpec>)>,
    },
}

impl MotionSpec {
    /// Advance `s` by `dt` seconds at simulation time `t`.
    fn propagate(&self, s: &mut [f64; 4], t: f64, dt: f64) {
        match self {
            MotionSpec::ConstantVelocity => {
                s[0] += s[2] * dt;
                s[1] += s[3] * dt;
            }
            MotionSpec::ConstantTurn { omega } => {
                let v = (s[2] * s[2] + s[3] * s[3]).sqrt();
                let heading = s[3].atan2(s[2]);
                let new_heading = heading + omega * dt;
                s[0] += v * heading.cos() * dt;
                s[1] += v * heading.sin() * dt;
                s[2] = v * new_heading.cos();
                s[3] = v * new_heading.sin();
            }
            MotionSpec::ConstantAccel { ax, ay } => {
                s[0] += s[2] * dt + 0.5 * ax * dt * dt;
                s[1] += s[3] * dt + 0.5 * ay * dt * dt;
                s[2] += ax * dt;
                s[3] += ay * dt;
            }
            MotionSpec::Segmented { segments } => {
                match segments.iter().rev().find(|(t_start, _)| *t_start <= t) {
                    Some((_, motion)) => motion.propagate(s, t, dt),
                    // Before first segment: CV
                    None => MotionSpec::ConstantVelocity.propagate(s, t, dt),
                }
            }
        }
    }
}

/// A simulated target with ground-truth state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Target {
    /// Unique target ID (used for metrics)
    pub id: u64,
    /// True state [px, py, vx, vy]
    pub state: [f64; 4],
    /// Motion model for this target
    pub motion: MotionSpec,
}

impl Target {
    pub fn new(id: u64, pos: [f64; 2], vel: [f64; 2], motion: MotionSpec) -> Self {
        Self {
            id,
            state: [pos[0], pos[1], vel[0], vel[1]],
            motion,
        }
    }

    /// Propagate true state by `dt` seconds according to its motion model.
    pub fn step(&mut self, t: f64, dt: f64) {
        self.motion.propagate(&mut self.state, t, dt);
    }

    /// True state `dt` seconds after simulation time `t`, without advancing.
    pub fn state_after(&self, t: f64, dt: f64) -> [f64; 4] {
        let mut s = self.state;
        self.motion.propagate(&mut s, t, dt);
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn constant_velocity_step() {
        let mut t = Target::new(0, [0.0, 0.0], [2.0, -1.0], MotionSpec::ConstantVelocity);
        t.step(0.0, 0.5);
        assert_eq!(t.state, [1.0, -0.5, 2.0, -1.0]);
    }

    #[test]
    fn constant_turn_keeps_speed() {
        let mut t = Target::new(0, [0.0, 0.0], [3.0, 4.0], MotionSpec::ConstantTurn { omega: 0.2 });
        for k in 0..100 {
            t.step(k as f64 * 0.1, 0.1);
        }
        let speed = (t.state[2].powi(2) + t.state[3].powi(2)).sqrt();
        assert_abs_diff_eq!(speed, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn state_after_does_not_advance() {
        let t = Target::new(0, [1.0, 1.0], [2.0, 0.0], MotionSpec::ConstantVelocity);
        assert_eq!(t.state_after(0.0, 0.25), [1.5, 1.0, 2.0, 0.0]);
        assert_eq!(t.state, [1.0, 1.0, 2.0, 0.0]);
    }

    #[test]
    fn segmented_switches_model() {
        let motion = MotionSpec::Segmented {
            segments: vec![
                (0.0, Box::new(MotionSpec::ConstantVelocity)),
                (1.0, Box::new(MotionSpec::ConstantAccel { ax: 1.0, ay: 0.0 })),
            ],
        };
        let mut t = Target::new(0, [0.0, 0.0], [1.0, 0.0], motion);
        t.step(0.5, 1.0);
        assert_abs_diff_eq!(t.state[2], 1.0, epsilon = 1e-12);
        t.step(1.5, 1.0);
        assert_abs_diff_eq!(t.state[2], 2.0, epsilon = 1e-12);
    }
}
