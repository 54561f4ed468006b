//! ADS-B observer: low-rate conflict detection and geometric
//! vector-sharing avoidance.
//!
//! Each cycle works on a consistent snapshot of every vehicle taken at a
//! tick boundary, then mutates only FCC state: it injects avoidance
//! waypoints on conflict and retracts them once the pair is clear.

use std::ops::DerefMut;

use tracing::{debug, info};

use airprox_core::events::{TelemetryEvent, TelemetrySink};
use airprox_core::state::SimulationState;
use airprox_core::types::Vec3;

use crate::fcc::Fcc;
use crate::vehicle::Vehicle;

/// Kinematic state of one vehicle as broadcast to the observer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdsbObservation {
    pub aircraft_id: u32,
    pub position: Vec3,
    pub velocity: Vec3,
    pub size: f64,
    pub roll_angle: f64,
    pub distance_covered: f64,
}

impl AdsbObservation {
    pub fn of(vehicle: &Vehicle) -> Self {
        Self {
            aircraft_id: vehicle.aircraft_id(),
            position: vehicle.position(),
            velocity: vehicle.velocity(),
            size: vehicle.size(),
            roll_angle: vehicle.roll_angle(),
            distance_covered: vehicle.distance_covered(),
        }
    }
}

/// Projected closest approach of a pair along current velocities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestApproach {
    /// Time until closest approach (s), clamped to now-or-later.
    pub time: f64,
    /// Separation vector at closest approach, from the first aircraft's
    /// predicted position to the second's.
    pub miss_vector: Vec3,
    pub miss_distance: f64,
}

/// Computes the closest approach, or `None` when the pair has no relative
/// motion (such a pair is never maneuvered).
pub fn closest_approach(first: &AdsbObservation, second: &AdsbObservation) -> Option<ClosestApproach> {
    let r = second.position - first.position;
    let v = second.velocity - first.velocity;
    let speed_sq = v.length_squared();
    if speed_sq < 1e-12 {
        return None;
    }
    let time = (-(r.dot(&v)) / speed_sq).max(0.0);
    let miss_vector = r + v * time;
    Some(ClosestApproach {
        time,
        miss_vector,
        miss_distance: miss_vector.length(),
    })
}

fn emit(telemetry: Option<&TelemetrySink>, event: TelemetryEvent) {
    if let Some(sink) = telemetry {
        sink(&event);
    }
}

/// Runs one full ADS-B cycle over a tick-boundary snapshot.
///
/// `fccs[k]` must belong to the aircraft of `observations[k]`; the
/// generic bound lets the threaded driver pass mutex guards and the
/// headless driver plain mutable borrows.
pub fn run_cycle<F>(
    observations: &[AdsbObservation],
    fccs: &mut [F],
    state: &SimulationState,
    conflict_horizon_secs: f64,
    telemetry: Option<&TelemetrySink>,
) where
    F: DerefMut<Target = Fcc>,
{
    let adsb_cycles = state.count_adsb_cycle();
    let physics_cycles = state.physics_cycles();

    // Trail sampling and the per-aircraft status report.
    for (observation, fcc) in observations.iter().zip(fccs.iter_mut()) {
        fcc.append_visited(observation.position);
        debug!(
            aircraft_id = observation.aircraft_id,
            speed = observation.velocity.length(),
            x = observation.position.x,
            y = observation.position.y,
            z = observation.position.z,
            yaw = observation.velocity.yaw_angle(),
            target_yaw = fcc.target_yaw_angle(),
            roll = observation.roll_angle,
            target_roll = fcc.target_roll_angle(),
            adsb_cycles,
            physics_cycles,
            "adsb report"
        );
        emit(
            telemetry,
            TelemetryEvent::AdsbReport {
                aircraft_id: observation.aircraft_id,
                position: observation.position,
                speed: observation.velocity.length(),
                yaw_angle: observation.velocity.yaw_angle(),
                target_yaw_angle: fcc.target_yaw_angle(),
                pitch_angle: observation.velocity.pitch_angle(),
                roll_angle: observation.roll_angle,
                target_roll_angle: fcc.target_roll_angle(),
                distance_covered: observation.distance_covered,
                adsb_cycles,
                physics_cycles,
            },
        );
    }

    let minimum_separation = state.minimum_separation();
    for i in 0..observations.len() {
        for j in (i + 1)..observations.len() {
            let Some(approach) = closest_approach(&observations[i], &observations[j]) else {
                continue;
            };
            let conflict = approach.miss_distance < minimum_separation
                && approach.time <= conflict_horizon_secs;

            let (left, right) = fccs.split_at_mut(j);
            let first_fcc = left[i].deref_mut();
            let second_fcc = right[0].deref_mut();

            if !conflict {
                if first_fcc.evade_maneuver() || second_fcc.evade_maneuver() {
                    info!(
                        first = observations[i].aircraft_id,
                        second = observations[j].aircraft_id,
                        "conflict cleared"
                    );
                    if first_fcc.reset_evade_maneuver() {
                        emit(
                            telemetry,
                            TelemetryEvent::EvadeCleared {
                                aircraft_id: observations[i].aircraft_id,
                            },
                        );
                    }
                    if second_fcc.reset_evade_maneuver() {
                        emit(
                            telemetry,
                            TelemetryEvent::EvadeCleared {
                                aircraft_id: observations[j].aircraft_id,
                            },
                        );
                    }
                } else {
                    first_fcc.set_safe_zone_occupied(false);
                    second_fcc.set_safe_zone_occupied(false);
                }
                continue;
            }

            info!(
                first = observations[i].aircraft_id,
                second = observations[j].aircraft_id,
                miss_distance = approach.miss_distance,
                time_to_closest_approach = approach.time,
                "conflict detected"
            );
            emit(
                telemetry,
                TelemetryEvent::ConflictDetected {
                    first_id: observations[i].aircraft_id,
                    second_id: observations[j].aircraft_id,
                    miss_distance: approach.miss_distance,
                    time_to_closest_approach: approach.time,
                },
            );

            if !state.avoid_collisions() {
                continue;
            }

            // Outward miss directions: the miss vector points from the
            // first aircraft's predicted position to the second's, so the
            // first diverges along its negation. An exact zero miss falls
            // back to the horizontal perpendicular of the relative
            // velocity, the lower-id aircraft taking the positive side.
            let (first_direction, second_direction) = match approach.miss_vector.normalized() {
                Some(unit) => (-unit, unit),
                None => {
                    let v = observations[j].velocity - observations[i].velocity;
                    let perpendicular = Vec3::new(v.y, -v.x, 0.0)
                        .normalized()
                        .unwrap_or(Vec3::new(1.0, 0.0, 0.0));
                    (perpendicular, -perpendicular)
                }
            };
            let magnitude = approach.miss_distance.max(1.0);
            let unresolved_region = minimum_separation - approach.miss_distance;

            for (index, fcc, direction) in [
                (i, first_fcc, first_direction),
                (j, second_fcc, second_direction),
            ] {
                let own = &observations[index];
                let opponent = &observations[if index == i { j } else { i }];
                if let Some(waypoint) = fcc.apply_evade_maneuver(
                    own.position,
                    own.velocity,
                    opponent.velocity,
                    direction * magnitude,
                    unresolved_region,
                    approach.time,
                    minimum_separation,
                ) {
                    emit(
                        telemetry,
                        TelemetryEvent::EvadeApplied {
                            aircraft_id: own.aircraft_id,
                            waypoint,
                        },
                    );
                }
                fcc.set_safe_zone_occupied(true);
            }
        }
    }
}
