//! Fundamental types used across the entire workspace.

use crate::error::FusionError;
use nalgebra::{DMatrix, DVector, Matrix4, Vector4};
use sensor_models::RadarObservation;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Scalar type: use f64 throughout for numerical precision in Kalman filter.
// ---------------------------------------------------------------------------

/// 2-D constant-velocity state vector: [px, py, vx, vy]
pub type StateVec = Vector4<f64>;

/// 4×4 state covariance matrix
pub type StateCov = Matrix4<f64>;

/// Generic dynamic-size vector (used for measurement innovation)
pub type DVec = DVector<f64>;

/// Generic dynamic-size matrix (used for H, R, S)
pub type DMat = DMatrix<f64>;

/// Microseconds per second; measurement timestamps are integer microseconds.
pub const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Copy a state vector into the plain array form used by `sensor_models`.
pub fn state_array(state: &StateVec) -> [f64; 4] {
    [state[0], state[1], state[2], state[3]]
}

// ---------------------------------------------------------------------------
// Sensor kind
// ---------------------------------------------------------------------------

/// Which sensor produced a measurement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    Laser,
    Radar,
}

impl SensorKind {
    /// Number of raw values a measurement from this sensor carries.
    pub fn measurement_dim(self) -> usize {
        match self {
            SensorKind::Laser => 2,
            SensorKind::Radar => 3,
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorKind::Laser => f.write_str("laser"),
            SensorKind::Radar => f.write_str("radar"),
        }
    }
}

// ---------------------------------------------------------------------------
// Measurement
// ---------------------------------------------------------------------------

/// A raw measurement record as delivered by the ingestion layer.
///
/// `raw` is `[x, y]` for a laser and `[range, bearing, range_rate]` for a
/// radar. It is only trusted after [`MeasurementPackage::reading`] validates it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasurementPackage {
    pub sensor: SensorKind,
    pub raw: Vec<f64>,
    /// Microseconds since an arbitrary epoch
    pub timestamp: i64,
}

impl MeasurementPackage {
    pub fn laser(x: f64, y: f64, timestamp: i64) -> Self {
        Self {
            sensor: SensorKind::Laser,
            raw: vec![x, y],
            timestamp,
        }
    }

    pub fn radar(range: f64, bearing: f64, range_rate: f64, timestamp: i64) -> Self {
        Self {
            sensor: SensorKind::Radar,
            raw: vec![range, bearing, range_rate],
            timestamp,
        }
    }

    /// Validate the raw values and convert them to a typed reading.
    pub fn reading(&self) -> Result<SensorReading, FusionError> {
        let expected = self.sensor.measurement_dim();
        if self.raw.len() != expected {
            return Err(FusionError::MalformedMeasurement {
                sensor: self.sensor,
                expected,
                got: self.raw.len(),
            });
        }
        if self.raw.iter().any(|v| !v.is_finite()) {
            return Err(FusionError::NonFiniteMeasurement {
                sensor: self.sensor,
            });
        }
        Ok(match self.sensor {
            SensorKind::Laser => SensorReading::Laser {
                x: self.raw[0],
                y: self.raw[1],
            },
            SensorKind::Radar => SensorReading::Radar {
                range: self.raw[0],
                bearing: self.raw[1],
                range_rate: self.raw[2],
            },
        })
    }
}

/// A validated observation value.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum SensorReading {
    /// Cartesian position (meters)
    Laser { x: f64, y: f64 },
    /// Polar coordinates from radar (meters, radians, m/s)
    Radar {
        range: f64,
        bearing: f64,
        range_rate: f64,
    },
}

impl SensorReading {
    pub fn sensor(&self) -> SensorKind {
        match self {
            SensorReading::Laser { .. } => SensorKind::Laser,
            SensorReading::Radar { .. } => SensorKind::Radar,
        }
    }

    /// Observation vector z in the sensor's own coordinates.
    pub fn to_vector(&self) -> DVec {
        match *self {
            SensorReading::Laser { x, y } => DVector::from_vec(vec![x, y]),
            SensorReading::Radar {
                range,
                bearing,
                range_rate,
            } => DVector::from_vec(vec![range, bearing, range_rate]),
        }
    }

    /// Return the measured position as cartesian [x, y].
    pub fn to_cartesian_2d(&self) -> (f64, f64) {
        match *self {
            SensorReading::Laser { x, y } => (x, y),
            SensorReading::Radar { range, bearing, .. } => {
                RadarObservation::polar_to_cartesian(range, bearing)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Estimate
// ---------------------------------------------------------------------------

/// Snapshot of the filter output after one processed measurement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub timestamp: i64,
    pub state: StateVec,
    pub cov: StateCov,
}

impl Estimate {
    pub fn position(&self) -> (f64, f64) {
        (self.state[0], self.state[1])
    }

    pub fn velocity(&self) -> (f64, f64) {
        (self.state[2], self.state[3])
    }
}
