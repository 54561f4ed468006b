//! Telemetry events emitted at tick boundaries.
//!
//! The engine never talks to a console or UI directly; observers register
//! a callback and receive these events instead.

use serde::{Deserialize, Serialize};

use crate::types::Vec3;

/// One observable occurrence inside the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryEvent {
    /// Per-aircraft status line, once per ADS-B cycle.
    AdsbReport {
        aircraft_id: u32,
        position: Vec3,
        speed: f64,
        yaw_angle: f64,
        target_yaw_angle: f64,
        pitch_angle: f64,
        roll_angle: f64,
        target_roll_angle: f64,
        distance_covered: f64,
        adsb_cycles: u64,
        physics_cycles: u64,
    },
    /// A pair's projected closest approach violates the safe zone within
    /// the look-ahead horizon.
    ConflictDetected {
        first_id: u32,
        second_id: u32,
        miss_distance: f64,
        time_to_closest_approach: f64,
    },
    /// An avoidance waypoint was injected at the head of an aircraft's
    /// destination queue.
    EvadeApplied { aircraft_id: u32, waypoint: Vec3 },
    /// The conflict cleared and the injected waypoint was removed.
    EvadeCleared { aircraft_id: u32 },
    /// Two aircraft made contact. `head_on` marks a contact at the
    /// projected closest-approach point, as opposed to a grazing one.
    Collision {
        first_id: u32,
        second_id: u32,
        position: Vec3,
        head_on: bool,
    },
}

/// Observer callback. Invoked from loop threads, so it must be
/// `Send + Sync`; implementations should return quickly.
pub type TelemetrySink = dyn Fn(&TelemetryEvent) + Send + Sync;
