//! Flight-control computer: the per-aircraft autopilot.
//!
//! Owns the destination queue and the commanded setpoints (yaw, pitch,
//! roll, speed). The physics loop calls [`Fcc::update`] every tick to
//! refresh the setpoints toward the active destination; the ADS-B loop
//! injects and retracts avoidance waypoints through
//! [`Fcc::apply_evade_maneuver`] / [`Fcc::reset_evade_maneuver`].

use std::collections::VecDeque;

use tracing::{debug, info, warn};

use airprox_core::constants::{MAX_PITCH_ANGLE, MAX_ROLL_ANGLE, WORLD_BOUND};
use airprox_core::error::SimError;
use airprox_core::types::{format_yaw_angle, normalize_angle, Vec3};

use crate::vehicle::Vehicle;

/// Yaw errors below this (degrees) command wings-level flight.
const YAW_DEADBAND: f64 = 1e-3;

/// Flight-control computer state for one aircraft.
#[derive(Debug, Clone, PartialEq)]
pub struct Fcc {
    aircraft_id: u32,
    destinations: VecDeque<Vec3>,
    destinations_history: Vec<Vec3>,
    /// Position trail sampled at ADS-B cadence, not physics cadence.
    visited: Vec<Vec3>,
    autopilot: bool,
    /// Set once the final queued destination has been visited.
    ignore_destinations: bool,
    initial_target: Vec3,
    target_yaw_angle: f64,
    target_pitch_angle: f64,
    target_roll_angle: f64,
    target_speed: f64,
    is_turning_left: bool,
    is_turning_right: bool,
    safe_zone_occupied: bool,
    evade_maneuver: bool,
    vector_sharing_resolution: Vec3,
}

impl Fcc {
    /// Creates an FCC with the initial target as its sole destination and
    /// the given cruise speed as the speed setpoint.
    pub fn new(aircraft_id: u32, initial_target: Vec3, target_speed: f64) -> Self {
        let mut destinations = VecDeque::new();
        destinations.push_back(initial_target);
        Self {
            aircraft_id,
            destinations,
            destinations_history: Vec::new(),
            visited: Vec::new(),
            autopilot: true,
            ignore_destinations: false,
            initial_target,
            target_yaw_angle: 0.0,
            target_pitch_angle: 0.0,
            target_roll_angle: 0.0,
            target_speed: target_speed.max(0.0),
            is_turning_left: false,
            is_turning_right: false,
            safe_zone_occupied: false,
            evade_maneuver: false,
            vector_sharing_resolution: Vec3::zero(),
        }
    }

    pub fn aircraft_id(&self) -> u32 {
        self.aircraft_id
    }

    pub fn destinations(&self) -> &VecDeque<Vec3> {
        &self.destinations
    }

    pub fn destinations_history(&self) -> &[Vec3] {
        &self.destinations_history
    }

    pub fn visited(&self) -> &[Vec3] {
        &self.visited
    }

    pub fn initial_target(&self) -> Vec3 {
        self.initial_target
    }

    pub fn autopilot(&self) -> bool {
        self.autopilot
    }

    pub fn set_autopilot(&mut self, enabled: bool) {
        self.autopilot = enabled;
    }

    pub fn ignore_destinations(&self) -> bool {
        self.ignore_destinations
    }

    pub fn target_yaw_angle(&self) -> f64 {
        self.target_yaw_angle
    }

    pub fn target_pitch_angle(&self) -> f64 {
        self.target_pitch_angle
    }

    pub fn target_roll_angle(&self) -> f64 {
        self.target_roll_angle
    }

    pub fn target_speed(&self) -> f64 {
        self.target_speed
    }

    pub fn is_turning_left(&self) -> bool {
        self.is_turning_left
    }

    pub fn is_turning_right(&self) -> bool {
        self.is_turning_right
    }

    pub fn safe_zone_occupied(&self) -> bool {
        self.safe_zone_occupied
    }

    pub fn set_safe_zone_occupied(&mut self, occupied: bool) {
        self.safe_zone_occupied = occupied;
    }

    pub fn evade_maneuver(&self) -> bool {
        self.evade_maneuver
    }

    pub fn vector_sharing_resolution(&self) -> Vec3 {
        self.vector_sharing_resolution
    }

    /// Adjusts the speed setpoint, floored at zero.
    pub fn accelerate(&mut self, delta: f64) {
        self.target_speed = (self.target_speed + delta).max(0.0);
    }

    /// Validates a candidate destination: rejects one coincident with the
    /// current position and snaps out-of-world components to the bound.
    pub fn check_new_destination(
        &self,
        destination: Vec3,
        current_position: Vec3,
    ) -> Result<Vec3, SimError> {
        if destination.distance_to(&current_position) < 1e-9 {
            return Err(SimError::InvalidDestination {
                aircraft_id: self.aircraft_id,
                reason: "coincident with current position".into(),
            });
        }
        let snapped = Vec3::new(
            destination.x.clamp(-WORLD_BOUND, WORLD_BOUND),
            destination.y.clamp(-WORLD_BOUND, WORLD_BOUND),
            destination.z.clamp(-WORLD_BOUND, WORLD_BOUND),
        );
        if snapped != destination {
            warn!(
                aircraft_id = self.aircraft_id,
                "destination beyond world bound, snapped to {snapped:?}"
            );
        }
        Ok(snapped)
    }

    /// Enqueues a destination at the tail of the queue.
    pub fn add_last_destination(
        &mut self,
        destination: Vec3,
        current_position: Vec3,
    ) -> Result<(), SimError> {
        let destination = self
            .check_new_destination(destination, current_position)
            .inspect_err(|err| warn!("destination rejected: {err}"))?;
        self.destinations.push_back(destination);
        self.ignore_destinations = false;
        Ok(())
    }

    /// Enqueues a destination at the head of the queue, ahead of the
    /// active one.
    pub fn add_first_destination(
        &mut self,
        destination: Vec3,
        current_position: Vec3,
    ) -> Result<(), SimError> {
        let destination = self
            .check_new_destination(destination, current_position)
            .inspect_err(|err| warn!("destination rejected: {err}"))?;
        self.destinations.push_front(destination);
        self.ignore_destinations = false;
        Ok(())
    }

    /// Samples the current position into the visited trail.
    pub fn append_visited(&mut self, position: Vec3) {
        self.visited.push(position);
    }

    /// Replaces the whole queue with a single pursuit target. Used by the
    /// forced-collision study mode, which chases the opponent's predicted
    /// position and bypasses destination validation.
    pub fn retarget(&mut self, target: Vec3) {
        self.destinations.clear();
        self.destinations.push_back(target);
        self.ignore_destinations = false;
        self.evade_maneuver = false;
        self.vector_sharing_resolution = Vec3::zero();
    }

    /// Per-tick setpoint refresh.
    pub fn update(&mut self, vehicle: &Vehicle) {
        if !self.autopilot {
            return;
        }
        self.update_target_yaw_pitch_angles(vehicle);
        self.update_target_roll_angle(vehicle.yaw_angle());
    }

    /// Pops a reached destination and recomputes the yaw/pitch setpoints
    /// toward the queue head. With an empty queue the previous setpoints
    /// hold.
    pub fn update_target_yaw_pitch_angles(&mut self, vehicle: &Vehicle) {
        let position = vehicle.position();

        if let Some(&head) = self.destinations.front() {
            if position.distance_to(&head) <= vehicle.size() {
                if let Some(reached) = self.destinations.pop_front() {
                    self.destinations_history.push(reached);
                }
                if self.evade_maneuver {
                    // The injected waypoint itself was reached; the evade
                    // is over even though nobody called reset.
                    self.evade_maneuver = false;
                    self.vector_sharing_resolution = Vec3::zero();
                    debug!(
                        aircraft_id = self.aircraft_id,
                        "evade waypoint reached, resuming route"
                    );
                }
                if self.destinations.is_empty() {
                    self.ignore_destinations = true;
                    info!(
                        aircraft_id = self.aircraft_id,
                        "visited final destination, holding course"
                    );
                } else {
                    info!(
                        aircraft_id = self.aircraft_id,
                        "visited destination, taking next"
                    );
                }
            }
        }

        let Some(&destination) = self.destinations.front() else {
            return;
        };
        let delta = destination - position;
        self.target_yaw_angle = normalize_angle(delta.x.atan2(delta.y).to_degrees());
        self.target_pitch_angle = delta
            .z
            .atan2(delta.horizontal_length())
            .to_degrees()
            .clamp(-MAX_PITCH_ANGLE, MAX_PITCH_ANGLE);
    }

    /// Commands a bank proportional to the yaw error, capped at the roll
    /// envelope. An exact 180° error turns right by convention
    /// (`format_yaw_angle` resolves the split to +180).
    pub fn update_target_roll_angle(&mut self, current_yaw: f64) {
        let difference = format_yaw_angle(self.target_yaw_angle - current_yaw);
        if difference.abs() < YAW_DEADBAND {
            self.target_roll_angle = 0.0;
            self.is_turning_left = false;
            self.is_turning_right = false;
        } else {
            self.target_roll_angle = difference.clamp(-MAX_ROLL_ANGLE, MAX_ROLL_ANGLE);
            self.is_turning_right = difference > 0.0;
            self.is_turning_left = difference < 0.0;
        }
    }

    /// Injects an avoidance waypoint derived from geometric vector
    /// sharing.
    ///
    /// `miss_distance_vector` is this aircraft's outward copy of the
    /// projected miss vector (pointing away from the opponent's predicted
    /// position), so the two aircraft of a conflicting pair diverge. The
    /// correction is split by speed weight: this aircraft takes
    /// `‖v_own‖ / (‖v_own‖ + ‖v_opp‖)` of the unresolved region.
    ///
    /// Returns the injected waypoint, or `None` when no maneuver applies
    /// (evade already active, or this aircraft is stationary).
    #[allow(clippy::too_many_arguments)]
    pub fn apply_evade_maneuver(
        &mut self,
        own_position: Vec3,
        own_velocity: Vec3,
        opponent_velocity: Vec3,
        miss_distance_vector: Vec3,
        unresolved_region: f64,
        time_to_closest_approach: f64,
        minimum_separation: f64,
    ) -> Option<Vec3> {
        if self.evade_maneuver {
            return None;
        }
        let own_speed = own_velocity.length();
        let combined_speed = own_speed + opponent_velocity.length();
        if combined_speed < 1e-9 {
            return None;
        }
        let weight = own_speed / combined_speed;
        let direction = miss_distance_vector.normalized()?;
        let resolution = direction * (unresolved_region * weight);
        let leg = resolution.length();
        if leg < 1e-9 {
            // Zero weight: the opponent absorbs the whole correction.
            return None;
        }
        self.vector_sharing_resolution = resolution;

        // The detour must carry past the encounter: start the waypoint at
        // the distance flown before closest approach, then push it further
        // out until it clears the opponent's predicted safe zone.
        let opponent_predicted =
            own_position + own_velocity * time_to_closest_approach - miss_distance_vector;
        let mut scale = (own_speed * time_to_closest_approach / leg).max(1.0);
        let mut waypoint = own_position + resolution * scale;
        let mut doublings = 0;
        while waypoint.distance_to(&opponent_predicted) < minimum_separation && doublings < 32 {
            scale *= 2.0;
            waypoint = own_position + resolution * scale;
            doublings += 1;
        }

        self.destinations.push_front(waypoint);
        self.evade_maneuver = true;
        info!(
            aircraft_id = self.aircraft_id,
            "evade maneuver: waypoint {waypoint:?}, resolution {resolution:?}"
        );
        Some(waypoint)
    }

    /// Retracts an active evade: removes the injected head waypoint and
    /// clears the conflict flags. Returns whether anything was retracted.
    pub fn reset_evade_maneuver(&mut self) -> bool {
        if !self.evade_maneuver {
            self.safe_zone_occupied = false;
            return false;
        }
        self.destinations.pop_front();
        self.evade_maneuver = false;
        self.vector_sharing_resolution = Vec3::zero();
        self.safe_zone_occupied = false;
        debug!(aircraft_id = self.aircraft_id, "evade maneuver cleared");
        true
    }

    /// Restores the FCC to its construction state: the initial target as
    /// sole destination and the given speed setpoint.
    pub fn reset(&mut self, target_speed: f64) {
        self.destinations.clear();
        self.destinations.push_back(self.initial_target);
        self.destinations_history.clear();
        self.visited.clear();
        self.autopilot = true;
        self.ignore_destinations = false;
        self.target_yaw_angle = 0.0;
        self.target_pitch_angle = 0.0;
        self.target_roll_angle = 0.0;
        self.target_speed = target_speed.max(0.0);
        self.is_turning_left = false;
        self.is_turning_right = false;
        self.safe_zone_occupied = false;
        self.evade_maneuver = false;
        self.vector_sharing_resolution = Vec3::zero();
    }
}
