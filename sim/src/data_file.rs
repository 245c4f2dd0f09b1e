//! Plain-text measurement logs.
//!
//! One record per line, fields separated by tabs or spaces:
//!
//! ```text
//! L  x    y                 timestamp  [gt_px gt_py gt_vx gt_vy]
//! R  rho  phi  rho_dot      timestamp  [gt_px gt_py gt_vx gt_vy]
//! ```
//!
//! Timestamps are integer microseconds. Blank lines and lines starting with
//! `#` are skipped.

use fusion_core::{MeasurementPackage, SensorKind};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use thiserror::Error;

/// Number of ground-truth values that may trail a record.
const GT_FIELDS: usize = 4;

/// One line of a measurement log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataRecord {
    pub package: MeasurementPackage,
    /// True [px, py, vx, vy] at the measurement time, when known
    pub ground_truth: Option<[f64; 4]>,
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line {line}: unknown sensor tag '{tag}'")]
    UnknownSensor { line: usize, tag: String },

    #[error("line {line}: expected {expected} fields after '{tag}' (plus optional ground truth), got {got}")]
    FieldCount {
        line: usize,
        tag: String,
        expected: usize,
        got: usize,
    },

    #[error("line {line}: invalid number '{value}'")]
    InvalidNumber { line: usize, value: String },

    #[error("line {line}: invalid timestamp '{value}'")]
    InvalidTimestamp { line: usize, value: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn sensor_tag(sensor: SensorKind) -> &'static str {
    match sensor {
        SensorKind::Laser => "L",
        SensorKind::Radar => "R",
    }
}

fn parse_f64(field: &str, line: usize) -> Result<f64, ParseError> {
    field.parse().map_err(|_| ParseError::InvalidNumber {
        line,
        value: field.to_string(),
    })
}

/// Parse a single line. `line` is 1-based and only used in errors.
/// Returns `Ok(None)` for blank and comment lines.
pub fn parse_line(text: &str, line: usize) -> Result<Option<DataRecord>, ParseError> {
    let text = text.trim();
    if text.is_empty() || text.starts_with('#') {
        return Ok(None);
    }

    let mut fields = text.split_whitespace();
    let tag = fields.next().unwrap_or_default();
    let sensor = match tag {
        "L" => SensorKind::Laser,
        "R" => SensorKind::Radar,
        _ => {
            return Err(ParseError::UnknownSensor {
                line,
                tag: tag.to_string(),
            })
        }
    };

    let rest: Vec<&str> = fields.collect();
    // measurement values + timestamp
    let expected = sensor.measurement_dim() + 1;
    if rest.len() != expected && rest.len() != expected + GT_FIELDS {
        return Err(ParseError::FieldCount {
            line,
            tag: tag.to_string(),
            expected,
            got: rest.len(),
        });
    }

    let raw = rest[..expected - 1]
        .iter()
        .map(|f| parse_f64(f, line))
        .collect::<Result<Vec<_>, _>>()?;
    let ts_field = rest[expected - 1];
    let timestamp = ts_field
        .parse::<i64>()
        .map_err(|_| ParseError::InvalidTimestamp {
            line,
            value: ts_field.to_string(),
        })?;

    let ground_truth = if rest.len() > expected {
        let mut gt = [0.0; GT_FIELDS];
        for (slot, f) in gt.iter_mut().zip(&rest[expected..]) {
            *slot = parse_f64(f, line)?;
        }
        Some(gt)
    } else {
        None
    };

    Ok(Some(DataRecord {
        package: MeasurementPackage {
            sensor,
            raw,
            timestamp,
        },
        ground_truth,
    }))
}

/// Parse every record from a reader.
pub fn parse_reader<R: BufRead>(reader: R) -> Result<Vec<DataRecord>, ParseError> {
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        if let Some(record) = parse_line(&line?, idx + 1)? {
            records.push(record);
        }
    }
    Ok(records)
}

/// Load a measurement log from disk.
pub fn read_data_file(path: &Path) -> Result<Vec<DataRecord>, ParseError> {
    let file = std::fs::File::open(path)?;
    parse_reader(BufReader::new(file))
}

/// Format a record as one tab-separated line (no trailing newline).
pub fn format_record(record: &DataRecord) -> String {
    let mut fields = vec![sensor_tag(record.package.sensor).to_string()];
    fields.extend(record.package.raw.iter().map(|v| v.to_string()));
    fields.push(record.package.timestamp.to_string());
    if let Some(gt) = &record.ground_truth {
        fields.extend(gt.iter().map(|v| v.to_string()));
    }
    fields.join("\t")
}

/// Write records in the text log format.
pub fn write_records<W: Write>(mut writer: W, records: &[DataRecord]) -> std::io::Result<()> {
    for record in records {
        writeln!(writer, "{}", format_record(record))?;
    }
    Ok(())
}
