//! `sensor_models` — Laser and radar observation models, conversion utilities, Jacobians.

pub mod laser;
pub mod observation;
pub mod radar;

pub use laser::LaserParams;
pub use observation::{
    normalize_angle, LaserObservation, ObservationModel, RadarObservation, MIN_RANGE, STATE_DIM,
};
pub use radar::RadarParams;
