//! Scenario definitions.
//!
//! Each scenario is a named configuration of targets and sensor parameters.
//! All scenarios are deterministic given the same seed.

use crate::target::{MotionSpec, Target};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use sensor_models::{LaserParams, RadarParams};
use serde::{Deserialize, Serialize};

/// Which pre-defined scenario to load.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum ScenarioKind {
    /// One target on a straight line past the sensors
    Straight,
    /// One target flying a figure of constant turns
    Turn,
    /// One target braking then accelerating
    Accelerate,
    /// Several targets crossing, each tracked by its own filter
    Crossing,
}

/// A fully configured simulation scenario.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub seed: u64,
    pub duration: f64, // seconds
    pub sim_dt: f64,   // simulation step (s)
    pub targets: Vec<Target>,
    pub laser: LaserParams,
    pub radar: RadarParams,
}

impl Scenario {
    /// Build the named scenario. Uses `seed` for repeatability.
    pub fn build(kind: ScenarioKind, seed: u64) -> Self {
        match kind {
            ScenarioKind::Straight => Self::straight(seed),
            ScenarioKind::Turn => Self::turn(seed),
            ScenarioKind::Accelerate => Self::accelerate(seed),
            ScenarioKind::Crossing => Self::crossing(seed),
        }
    }

    fn with_targets(name: &str, seed: u64, duration: f64, targets: Vec<Target>) -> Self {
        Scenario {
            name: name.into(),
            seed,
            duration,
            sim_dt: 0.01,
            targets,
            laser: LaserParams::default(),
            radar: RadarParams::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Scenario 1: Straight
    // -----------------------------------------------------------------------
    fn straight(seed: u64) -> Self {
        let targets = vec![Target::new(
            0,
            [-10.0, 3.0],
            [2.0, 0.0],
            MotionSpec::ConstantVelocity,
        )];
        Self::with_targets("straight", seed, 10.0, targets)
    }

    // -----------------------------------------------------------------------
    // Scenario 2: Turn
    // -----------------------------------------------------------------------
    fn turn(seed: u64) -> Self {
        let motion = MotionSpec::Segmented {
            segments: vec![
                (0.0, Box::new(MotionSpec::ConstantTurn { omega: 0.4 })),
                (8.0, Box::new(MotionSpec::ConstantTurn { omega: -0.4 })),
                (16.0, Box::new(MotionSpec::ConstantVelocity)),
            ],
        };
        let targets = vec![Target::new(0, [0.6, 0.6], [5.2, 0.0], motion)];
        Self::with_targets("turn", seed, 22.0, targets)
    }

    // -----------------------------------------------------------------------
    // Scenario 3: Accelerate
    // -----------------------------------------------------------------------
    fn accelerate(seed: u64) -> Self {
        let motion = MotionSpec::Segmented {
            segments: vec![
                (0.0, Box::new(MotionSpec::ConstantAccel { ax: -1.0, ay: 0.0 })),
                (4.0, Box::new(MotionSpec::ConstantVelocity)),
                (6.0, Box::new(MotionSpec::ConstantAccel { ax: 1.5, ay: 0.5 })),
            ],
        };
        let targets = vec![Target::new(0, [5.0, -5.0], [4.0, 1.0], motion)];
        Self::with_targets("accelerate", seed, 12.0, targets)
    }

    // -----------------------------------------------------------------------
    // Scenario 4: Crossing
    // -----------------------------------------------------------------------
    fn crossing(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(1));
        let n = 8;
        let targets = (0..n)
            .map(|i| {
                // Start on a circle, head through the neighbourhood of the origin
                let angle = i as f64 * std::f64::consts::TAU / n as f64;
                let r = 25.0;
                let pos = [r * angle.cos(), r * angle.sin()];
                let speed = rng.gen_range(2.0..6.0);
                let miss = rng.gen_range(-0.3..0.3);
                let heading = angle + std::f64::consts::PI + miss;
                let vel = [speed * heading.cos(), speed * heading.sin()];
                let motion = if i % 3 == 0 {
                    MotionSpec::ConstantTurn {
                        omega: rng.gen_range(-0.1..0.1),
                    }
                } else {
                    MotionSpec::ConstantVelocity
                };
                Target::new(i, pos, vel, motion)
            })
            .collect();
        Self::with_targets("crossing", seed, 8.0, targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_is_deterministic() {
        let a = Scenario::build(ScenarioKind::Crossing, 5);
        let b = Scenario::build(ScenarioKind::Crossing, 5);
        assert_eq!(a.targets.len(), 8);
        for (ta, tb) in a.targets.iter().zip(&b.targets) {
            assert_eq!(ta.state, tb.state);
        }
    }

    #[test]
    fn every_kind_builds() {
        for kind in [
            ScenarioKind::Straight,
            ScenarioKind::Turn,
            ScenarioKind::Accelerate,
            ScenarioKind::Crossing,
        ] {
            let s = Scenario::build(kind, 0);
            assert!(!s.targets.is_empty());
            assert!(s.duration > 0.0 && s.sim_dt > 0.0);
        }
    }
}
