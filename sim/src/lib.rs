//! `sim` — Scenario simulator: target trajectories, laser/radar measurements,
//! replay logs and text measurement files.

pub mod data_file;
pub mod replay;
pub mod scenarios;
pub mod sensor_sim;
pub mod target;

pub use data_file::{read_data_file, DataRecord, ParseError};
pub use replay::{load_replay, record, save_replay, ReplayLog};
pub use scenarios::{Scenario, ScenarioKind};
pub use sensor_sim::{SensorSimulator, SimMeasurement};
pub use target::{MotionSpec, Target};
