//! Scenario CSV persistence.
//!
//! One row per scenario: the seed record plus the recorded outcome of
//! both runs (avoidance off and on). `simulation.csv` is the active
//! scenario file; batch passes write `simulation-YYYY-MM-DD-HH-MM-SS.csv`
//! next to it with the same schema.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use csv::{StringRecord, Writer};
use tracing::warn;

use airprox_core::error::SimError;
use airprox_core::records::{ScenarioRecord, ScenarioResult};
use airprox_core::types::Vec3;

/// Name of the currently-active scenario file.
pub const ACTIVE_SCENARIO_FILE: &str = "simulation.csv";

pub const COLUMN_COUNT: usize = 48;

pub const HEADER: [&str; COLUMN_COUNT] = [
    "test_id",
    "aircraft_angle",
    "a1_init_pos_x",
    "a1_init_pos_y",
    "a1_init_pos_z",
    "a2_init_pos_x",
    "a2_init_pos_y",
    "a2_init_pos_z",
    "a1_init_speed_x",
    "a1_init_speed_y",
    "a1_init_speed_z",
    "a2_init_speed_x",
    "a2_init_speed_y",
    "a2_init_speed_z",
    "a1_init_target_x",
    "a1_init_target_y",
    "a1_init_target_z",
    "a2_init_target_x",
    "a2_init_target_y",
    "a2_init_target_z",
    "a1_final_pos_noavoid_x",
    "a1_final_pos_noavoid_y",
    "a1_final_pos_noavoid_z",
    "a2_final_pos_noavoid_x",
    "a2_final_pos_noavoid_y",
    "a2_final_pos_noavoid_z",
    "a1_final_pos_avoid_x",
    "a1_final_pos_avoid_y",
    "a1_final_pos_avoid_z",
    "a2_final_pos_avoid_x",
    "a2_final_pos_avoid_y",
    "a2_final_pos_avoid_z",
    "a1_final_speed_noavoid_x",
    "a1_final_speed_noavoid_y",
    "a1_final_speed_noavoid_z",
    "a2_final_speed_noavoid_x",
    "a2_final_speed_noavoid_y",
    "a2_final_speed_noavoid_z",
    "a1_final_speed_avoid_x",
    "a1_final_speed_avoid_y",
    "a1_final_speed_avoid_z",
    "a2_final_speed_avoid_x",
    "a2_final_speed_avoid_y",
    "a2_final_speed_avoid_z",
    "collision_noavoid",
    "collision_avoid",
    "min_dist_noavoid",
    "min_dist_avoid",
];

/// Recorded outcome columns of one scenario row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowOutcomes {
    pub final_positions_noavoid: [Vec3; 2],
    pub final_positions_avoid: [Vec3; 2],
    pub final_velocities_noavoid: [Vec3; 2],
    pub final_velocities_avoid: [Vec3; 2],
    pub collision_noavoid: bool,
    pub collision_avoid: bool,
    pub min_dist_noavoid: f64,
    pub min_dist_avoid: f64,
}

impl RowOutcomes {
    pub fn from_results(noavoid: &ScenarioResult, avoid: &ScenarioResult) -> Self {
        Self {
            final_positions_noavoid: noavoid.final_positions,
            final_positions_avoid: avoid.final_positions,
            final_velocities_noavoid: noavoid.final_velocities,
            final_velocities_avoid: avoid.final_velocities,
            collision_noavoid: noavoid.collision,
            collision_avoid: avoid.collision,
            min_dist_noavoid: noavoid.minimal_relative_distance,
            min_dist_avoid: avoid.minimal_relative_distance,
        }
    }
}

/// One parsed scenario row: inputs plus recorded outcomes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenarioRow {
    pub record: ScenarioRecord,
    pub outcomes: RowOutcomes,
}

fn parse_field(row: usize, record: &StringRecord, column: usize) -> Result<f64, SimError> {
    let text = record
        .get(column)
        .ok_or_else(|| SimError::InvalidScenario {
            row,
            reason: format!("missing column {}", HEADER[column]),
        })?;
    let value: f64 = text.trim().parse().map_err(|_| SimError::InvalidScenario {
        row,
        reason: format!("unparsable {} = {text:?}", HEADER[column]),
    })?;
    if !value.is_finite() {
        return Err(SimError::InvalidScenario {
            row,
            reason: format!("non-finite {}", HEADER[column]),
        });
    }
    Ok(value)
}

fn parse_vec3(row: usize, record: &StringRecord, column: usize) -> Result<Vec3, SimError> {
    Ok(Vec3::new(
        parse_field(row, record, column)?,
        parse_field(row, record, column + 1)?,
        parse_field(row, record, column + 2)?,
    ))
}

fn parse_bool(row: usize, record: &StringRecord, column: usize) -> Result<bool, SimError> {
    match record.get(column).map(str::trim) {
        Some("true") => Ok(true),
        Some("false") => Ok(false),
        other => Err(SimError::InvalidScenario {
            row,
            reason: format!("invalid boolean {} = {other:?}", HEADER[column]),
        }),
    }
}

/// Parses one CSV record into a scenario row.
pub fn parse_row(row: usize, record: &StringRecord) -> Result<ScenarioRow, SimError> {
    if record.len() != COLUMN_COUNT {
        return Err(SimError::InvalidScenario {
            row,
            reason: format!("expected {COLUMN_COUNT} columns, found {}", record.len()),
        });
    }
    let test_id = parse_field(row, record, 0)? as u32;
    let scenario = ScenarioRecord {
        test_id,
        aircraft_angle: parse_field(row, record, 1)?,
        initial_positions: [parse_vec3(row, record, 2)?, parse_vec3(row, record, 5)?],
        initial_velocities: [parse_vec3(row, record, 8)?, parse_vec3(row, record, 11)?],
        initial_targets: [parse_vec3(row, record, 14)?, parse_vec3(row, record, 17)?],
        // The archived schema carries no roll columns
        initial_roll_angles: [0.0, 0.0],
    };
    let outcomes = RowOutcomes {
        final_positions_noavoid: [parse_vec3(row, record, 20)?, parse_vec3(row, record, 23)?],
        final_positions_avoid: [parse_vec3(row, record, 26)?, parse_vec3(row, record, 29)?],
        final_velocities_noavoid: [parse_vec3(row, record, 32)?, parse_vec3(row, record, 35)?],
        final_velocities_avoid: [parse_vec3(row, record, 38)?, parse_vec3(row, record, 41)?],
        collision_noavoid: parse_bool(row, record, 44)?,
        collision_avoid: parse_bool(row, record, 45)?,
        min_dist_noavoid: parse_field(row, record, 46)?,
        min_dist_avoid: parse_field(row, record, 47)?,
    };
    Ok(ScenarioRow {
        record: scenario,
        outcomes,
    })
}

/// Reads all rows of a scenario file. Malformed rows surface as errors in
/// place so the batch can skip them and keep going.
pub fn read_rows(path: &Path) -> Result<Vec<Result<ScenarioRow, SimError>>, Box<dyn Error>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let row = index + 1;
        let parsed = match record {
            Ok(record) => parse_row(row, &record),
            Err(err) => Err(SimError::InvalidScenario {
                row,
                reason: err.to_string(),
            }),
        };
        rows.push(parsed);
    }
    Ok(rows)
}

/// Loads a single well-formed row by index.
pub fn load_row(path: &Path, index: usize) -> Result<ScenarioRow, Box<dyn Error>> {
    let rows = read_rows(path)?;
    let row = rows
        .into_iter()
        .nth(index)
        .ok_or_else(|| format!("{} has no row {index}", path.display()))?;
    Ok(row?)
}

fn push_vec3(fields: &mut Vec<String>, vector: Vec3) {
    fields.push(vector.x.to_string());
    fields.push(vector.y.to_string());
    fields.push(vector.z.to_string());
}

fn row_fields(row: &ScenarioRow) -> Vec<String> {
    let mut fields = Vec::with_capacity(COLUMN_COUNT);
    fields.push(row.record.test_id.to_string());
    fields.push(row.record.aircraft_angle.to_string());
    for vector in row.record.initial_positions {
        push_vec3(&mut fields, vector);
    }
    for vector in row.record.initial_velocities {
        push_vec3(&mut fields, vector);
    }
    for vector in row.record.initial_targets {
        push_vec3(&mut fields, vector);
    }
    for vector in row.outcomes.final_positions_noavoid {
        push_vec3(&mut fields, vector);
    }
    for vector in row.outcomes.final_positions_avoid {
        push_vec3(&mut fields, vector);
    }
    for vector in row.outcomes.final_velocities_noavoid {
        push_vec3(&mut fields, vector);
    }
    for vector in row.outcomes.final_velocities_avoid {
        push_vec3(&mut fields, vector);
    }
    fields.push(row.outcomes.collision_noavoid.to_string());
    fields.push(row.outcomes.collision_avoid.to_string());
    fields.push(row.outcomes.min_dist_noavoid.to_string());
    fields.push(row.outcomes.min_dist_avoid.to_string());
    fields
}

/// Writes a scenario file with the standard header.
pub fn write_rows(path: &Path, rows: &[ScenarioRow]) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut writer = Writer::from_path(path)?;
    writer.write_record(HEADER)?;
    for row in rows {
        writer.write_record(row_fields(row))?;
    }
    writer.flush()?;
    Ok(())
}

/// Timestamped result-file path next to the active scenario file.
pub fn timestamped_export_path(directory: &Path) -> PathBuf {
    let stamp = Local::now().format("%Y-%m-%d-%H-%M-%S");
    directory.join(format!("simulation-{stamp}.csv"))
}

/// Exports one aircraft's visited-position trail.
pub fn export_visited(
    directory: &Path,
    aircraft_id: u32,
    visited: &[Vec3],
) -> Result<PathBuf, Box<dyn Error>> {
    fs::create_dir_all(directory)?;
    let stamp = Local::now().format("%Y-%m-%d-%H-%M-%S");
    let path = directory.join(format!("visited-aircraft-{aircraft_id}-{stamp}.csv"));
    let mut writer = Writer::from_path(&path)?;
    writer.write_record(["x", "y", "z"])?;
    for position in visited {
        writer.write_record([
            format!("{:.2}", position.x),
            format!("{:.2}", position.y),
            format!("{:.2}", position.z),
        ])?;
    }
    writer.flush()?;
    if visited.is_empty() {
        warn!(aircraft_id, "exported an empty visited trail");
    }
    Ok(path)
}
