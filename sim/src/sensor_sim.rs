//! Laser and radar measurement simulator.
//!
//! Generates asynchronous measurements with:
//! - Gaussian noise drawn from each sensor's configured standard deviations
//! - Independent refresh schedules per sensor (radar offset by half a laser
//!   period so the two streams interleave)
//! - Radar bearing wrapped into (−π, π]

use crate::data_file::DataRecord;
use crate::target::Target;
use fusion_core::types::MICROS_PER_SECOND;
use fusion_core::{MeasurementPackage, SensorKind};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use sensor_models::{normalize_angle, LaserParams, RadarObservation, RadarParams};
use serde::{Deserialize, Serialize};

/// One configured sensor schedule in the simulation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimSensor {
    pub kind: SensorKind,
    /// Seconds between scans
    pub period: f64,
    /// Time of the first scan
    pub first_scan: f64,
    /// Scans emitted so far
    pub scans: u64,
}

impl SimSensor {
    pub fn new(kind: SensorKind, refresh_rate: f64, first_scan: f64) -> Self {
        Self {
            kind,
            period: 1.0 / refresh_rate,
            first_scan,
            scans: 0,
        }
    }

    /// Next scheduled scan time. Computed from the scan count so the schedule
    /// does not drift.
    pub fn next_scan_time(&self) -> f64 {
        self.first_scan + self.scans as f64 * self.period
    }
}

/// A simulated measurement of one target.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimMeasurement {
    pub target_id: u64,
    pub record: DataRecord,
}

/// Generates laser and radar measurements from a set of targets.
pub struct SensorSimulator {
    pub laser: LaserParams,
    pub radar: RadarParams,
    pub sensors: Vec<SimSensor>,
    rng: ChaCha8Rng,
}

impl SensorSimulator {
    pub fn new(laser: LaserParams, radar: RadarParams, seed: u64) -> Self {
        let laser_sensor = SimSensor::new(SensorKind::Laser, laser.refresh_rate, 0.0);
        let radar_sensor = SimSensor::new(
            SensorKind::Radar,
            radar.refresh_rate,
            0.5 / laser.refresh_rate,
        );
        Self {
            laser,
            radar,
            sensors: vec![laser_sensor, radar_sensor],
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn noise(&mut self, sigma: f64) -> f64 {
        let n: f64 = self.rng.sample(StandardNormal);
        n * sigma
    }

    /// Generate every measurement scheduled in `[sim_time, sim_time + dt)`,
    /// in scan-time order then target order. `targets` hold their state at
    /// `sim_time`; each is observed (and its ground truth taken) at the exact
    /// scan time.
    pub fn generate(&mut self, targets: &[Target], sim_time: f64, dt: f64) -> Vec<SimMeasurement> {
        let window_end = sim_time + dt;
        let mut scans: Vec<(f64, SensorKind)> = Vec::new();
        for sensor in &mut self.sensors {
            while sensor.next_scan_time() < window_end {
                scans.push((sensor.next_scan_time(), sensor.kind));
                sensor.scans += 1;
            }
        }
        scans.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut out = Vec::with_capacity(scans.len() * targets.len());
        for (scan_time, kind) in scans {
            let timestamp = (scan_time * MICROS_PER_SECOND).round() as i64;
            for target in targets {
                let truth = target.state_after(sim_time, scan_time - sim_time);
                let package = self.measure(kind, &truth, timestamp);
                out.push(SimMeasurement {
                    target_id: target.id,
                    record: DataRecord {
                        package,
                        ground_truth: Some(truth),
                    },
                });
            }
        }

        out
    }

    /// Noisy observation of `state` by the given sensor.
    pub fn measure(&mut self, kind: SensorKind, state: &[f64; 4], timestamp: i64) -> MeasurementPackage {
        match kind {
            SensorKind::Laser => {
                let x = state[0] + self.noise(self.laser.sigma_x);
                let y = state[1] + self.noise(self.laser.sigma_y);
                MeasurementPackage::laser(x, y, timestamp)
            }
            SensorKind::Radar => {
                let (range, bearing, range_rate) = RadarObservation::state_to_polar(state);
                let noisy_range = (range + self.noise(self.radar.sigma_range)).max(0.0);
                let noisy_bearing = normalize_angle(bearing + self.noise(self.radar.sigma_bearing));
                let noisy_rate = range_rate + self.noise(self.radar.sigma_range_rate);
                MeasurementPackage::radar(noisy_range, noisy_bearing, noisy_rate, timestamp)
            }
        }
    }
}
