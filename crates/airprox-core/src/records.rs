//! Scenario input and outcome records.
//!
//! A [`ScenarioRecord`] seeds a two-aircraft encounter; a
//! [`ScenarioResult`] is the same record extended with what actually
//! happened. Both are plain serializable data — the driver layer decides
//! how they are persisted.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ADSB_HZ, DEFAULT_CONFLICT_HORIZON_SECS, DEFAULT_MINIMUM_SEPARATION,
    DEFAULT_PHYSICS_HZ,
};
use crate::types::Vec3;

/// Initial conditions for one recorded test scenario.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRecord {
    pub test_id: u32,
    /// Bearing from the first aircraft to the second at t = 0 (degrees,
    /// clockwise from North).
    pub aircraft_angle: f64,
    pub initial_positions: [Vec3; 2],
    pub initial_velocities: [Vec3; 2],
    pub initial_targets: [Vec3; 2],
    /// Not part of the archived CSV schema; defaults to level wings.
    #[serde(default)]
    pub initial_roll_angles: [f64; 2],
}

impl ScenarioRecord {
    /// Recompute the t = 0 inter-aircraft bearing from the positions.
    pub fn bearing_at_start(&self) -> f64 {
        (self.initial_positions[1] - self.initial_positions[0]).yaw_angle()
    }
}

/// Outcome of one scenario run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub record: ScenarioRecord,
    pub final_positions: [Vec3; 2],
    pub final_velocities: [Vec3; 2],
    pub collision: bool,
    /// Smallest projected miss distance observed by the ADS-B loop (m).
    pub minimal_relative_distance: f64,
    /// Physics rate the run was integrated at (Hz), recorded so archived
    /// results stay reproducible when the rate is tuned.
    pub physics_hz: f64,
}

/// Tunable per-run parameters. The rates are parameters rather than
/// constants because archived datasets were produced at more than one
/// physics rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub physics_hz: f64,
    pub adsb_hz: f64,
    /// Safe-zone radius (m).
    pub minimum_separation: f64,
    /// Conflict look-ahead horizon (s).
    pub conflict_horizon_secs: f64,
    /// Simulated-time budget for a headless run (s).
    pub duration_secs: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            physics_hz: DEFAULT_PHYSICS_HZ,
            adsb_hz: DEFAULT_ADSB_HZ,
            minimum_separation: DEFAULT_MINIMUM_SEPARATION,
            conflict_horizon_secs: DEFAULT_CONFLICT_HORIZON_SECS,
            duration_secs: 10_000.0,
        }
    }
}

impl RunConfig {
    /// Physics step duration (s).
    pub fn physics_dt(&self) -> f64 {
        1.0 / self.physics_hz
    }

    /// ADS-B cycle duration (s).
    pub fn adsb_dt(&self) -> f64 {
        1.0 / self.adsb_hz
    }

    /// Whole physics ticks per ADS-B cycle (the cadence ratio, 100:1 at
    /// the defaults).
    pub fn physics_ticks_per_adsb_cycle(&self) -> u64 {
        (self.physics_hz / self.adsb_hz).round().max(1.0) as u64
    }
}
