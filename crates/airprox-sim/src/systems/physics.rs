//! Fixed-step physics: setpoint tracking with angular inertia, the
//! coordinated-turn yaw relation, bounded acceleration, and the
//! sphere-sphere collision check.

use tracing::warn;

use airprox_core::constants::{
    G_ACCELERATION, MAX_ACCELERATION, MAX_PITCH_ANGLE, MAX_ROLL_ANGLE, PITCH_DYNAMIC_DELAY_MS,
    ROLL_DYNAMIC_DELAY_MS,
};
use airprox_core::events::{TelemetryEvent, TelemetrySink};
use airprox_core::state::SimulationState;
use airprox_core::types::{format_yaw_angle, normalize_angle, Vec3};

use crate::aircraft::Aircraft;
use crate::fcc::Fcc;
use crate::vehicle::Vehicle;

/// Horizontal speeds below this (m/s) produce no coordinated turn.
const MIN_TURN_SPEED: f64 = 1e-6;

/// Moves `current` toward `target` by at most `max_step`.
fn bounded_step(current: f64, target: f64, max_step: f64) -> f64 {
    let difference = target - current;
    if difference.abs() <= max_step {
        target
    } else {
        current + max_step.copysign(difference)
    }
}

/// The opponent's predicted position one second out, used as the pursuit
/// point by the forced-collision study mode.
pub fn pursuit_target(opponent: &Vehicle) -> Vec3 {
    opponent.position() + opponent.velocity()
}

/// Advances one aircraft by one physics step of `dt` seconds.
///
/// Order per step: refresh FCC setpoints, apply inertia-limited roll and
/// pitch, derive the yaw rate from the bank angle, converge the speed,
/// then rebuild the velocity vector and translate.
pub fn step_aircraft(vehicle: &mut Vehicle, fcc: &mut Fcc, dt: f64, pursuit: Option<Vec3>) {
    if let Some(target) = pursuit {
        fcc.retarget(target);
    }
    fcc.update(vehicle);

    // Roll and pitch approach their setpoints at the inertia-limited rate.
    let roll_rate = MAX_ROLL_ANGLE / (ROLL_DYNAMIC_DELAY_MS / 1000.0);
    let new_roll = bounded_step(vehicle.roll_angle(), fcc.target_roll_angle(), roll_rate * dt);
    let roll_delta = new_roll - vehicle.roll_angle();

    let pitch_rate = MAX_PITCH_ANGLE / (PITCH_DYNAMIC_DELAY_MS / 1000.0);
    let new_pitch = bounded_step(vehicle.pitch_angle(), fcc.target_pitch_angle(), pitch_rate * dt);

    // Coordinated turn: dψ/dt = g·tan(roll) / v_xy, sign from the
    // commanded turn direction. A bank still opposing the commanded
    // direction (mid-reversal) produces no turn yet.
    let horizontal_speed = vehicle.horizontal_speed();
    let mut new_yaw = vehicle.yaw_angle();
    let turn_direction = if fcc.is_turning_right() {
        1.0
    } else if fcc.is_turning_left() {
        -1.0
    } else {
        0.0
    };
    if horizontal_speed > MIN_TURN_SPEED
        && turn_direction != 0.0
        && new_roll.signum() == turn_direction
    {
        let yaw_rate =
            (G_ACCELERATION * new_roll.to_radians().tan().abs() / horizontal_speed).to_degrees();
        let max_step = yaw_rate * dt;
        let remaining = format_yaw_angle(fcc.target_yaw_angle() - new_yaw);
        if remaining.abs() <= max_step && remaining.signum() == turn_direction {
            new_yaw = fcc.target_yaw_angle();
        } else {
            new_yaw = normalize_angle(new_yaw + turn_direction * max_step);
        }
    }

    // Speed converges under the acceleration limit.
    let new_speed = bounded_step(vehicle.speed(), fcc.target_speed(), MAX_ACCELERATION * dt);

    // Rebuild the velocity vector from (speed, yaw, pitch) and advance.
    let pitch_rad = new_pitch.to_radians();
    let yaw_rad = new_yaw.to_radians();
    let velocity = Vec3::new(
        new_speed * pitch_rad.cos() * yaw_rad.sin(),
        new_speed * pitch_rad.cos() * yaw_rad.cos(),
        new_speed * pitch_rad.sin(),
    );
    vehicle.set_velocity(velocity);
    vehicle.move_by(velocity.x * dt, velocity.y * dt, velocity.z * dt);
    vehicle.roll(roll_delta);
}

/// A registered collision between two aircraft.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub first_id: u32,
    pub second_id: u32,
    /// Midpoint between the two centers at contact.
    pub position: Vec3,
    /// Contact at the projected closest-approach point (within one step),
    /// as opposed to a grazing intersection.
    pub head_on: bool,
    /// Whether each aircraft's own velocity pointed at the other at
    /// contact. A trailing catch-up marks only the closing aircraft.
    pub first_caused: bool,
    pub second_caused: bool,
}

/// Sphere-sphere intersection check for one pair.
pub fn check_contact(first: &Vehicle, second: &Vehicle, dt: f64) -> Option<Contact> {
    let r = second.position() - first.position();
    if r.length() > first.size() + second.size() {
        return None;
    }

    let relative = second.velocity() - first.velocity();
    let speed_sq = relative.length_squared();
    let closest_time = if speed_sq < 1e-12 {
        0.0
    } else {
        -(r.dot(&relative)) / speed_sq
    };
    // The projected closest-approach midpoint drifts from the contact
    // midpoint by |v₁+v₂|·|t*|/2; within one step's travel it is head-on.
    let mean_drift = (first.velocity() + second.velocity()).length() * closest_time.abs() / 2.0;
    let max_step = first.speed().max(second.speed()) * dt;
    let head_on = mean_drift <= max_step;

    let first_caused = first.velocity().dot(&r) > 0.0;
    let second_caused = second.velocity().dot(&(-r)) > 0.0;

    Some(Contact {
        first_id: first.aircraft_id(),
        second_id: second.aircraft_id(),
        position: (first.position() + second.position()) * 0.5,
        head_on,
        first_caused,
        second_caused,
    })
}

/// Pairwise separation scan after all aircraft have advanced. Records the
/// running minimum separation and registers any contact. Returns whether
/// a collision was registered.
pub fn contact_scan(
    vehicles: &[&Vehicle],
    state: &SimulationState,
    dt: f64,
    telemetry: Option<&TelemetrySink>,
) -> bool {
    let mut collided = false;
    for i in 0..vehicles.len() {
        for j in (i + 1)..vehicles.len() {
            let first = vehicles[i];
            let second = vehicles[j];
            state.record_relative_distance(first.position().distance_to(&second.position()));
            if let Some(contact) = check_contact(first, second, dt) {
                collided = true;
                state.set_cause_collision(contact.first_id, contact.first_caused);
                state.set_cause_collision(contact.second_id, contact.second_caused);
                warn!(
                    first = contact.first_id,
                    second = contact.second_id,
                    head_on = contact.head_on,
                    "aircraft collided at {:?}",
                    contact.position
                );
                if let Some(sink) = telemetry {
                    sink(&TelemetryEvent::Collision {
                        first_id: contact.first_id,
                        second_id: contact.second_id,
                        position: contact.position,
                        head_on: contact.head_on,
                    });
                }
            }
        }
    }
    if collided {
        state.register_collision();
    }
    collided
}

/// One full physics tick over an owned aircraft slice (headless mode):
/// advance every aircraft in id order, then scan for contacts. Returns
/// whether a collision was registered.
pub fn tick(
    aircraft: &mut [Aircraft],
    state: &SimulationState,
    dt: f64,
    telemetry: Option<&TelemetrySink>,
) -> bool {
    let pursuits: Vec<Option<Vec3>> = (0..aircraft.len())
        .map(|i| {
            let forced = match i {
                0 => state.first_cause_collision(),
                1 => state.second_cause_collision(),
                _ => false,
            };
            if forced && aircraft.len() >= 2 {
                Some(pursuit_target(aircraft[1 - i].vehicle()))
            } else {
                None
            }
        })
        .collect();

    for (craft, pursuit) in aircraft.iter_mut().zip(pursuits) {
        let (vehicle, fcc) = craft.parts_mut();
        step_aircraft(vehicle, fcc, dt, pursuit);
    }
    state.count_physics_cycle();

    let vehicles: Vec<&Vehicle> = aircraft.iter().map(|a| a.vehicle()).collect();
    contact_scan(&vehicles, state, dt, telemetry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_bounded_step_snaps_and_limits() {
        assert_abs_diff_eq!(bounded_step(0.0, 5.0, 10.0), 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(bounded_step(0.0, 5.0, 2.0), 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(bounded_step(5.0, 0.0, 2.0), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_straight_flight_holds_course() {
        let mut vehicle = Vehicle::new(
            0,
            Vec3::new(0.0, 0.0, 100.0),
            Vec3::new(0.0, 50.0, 0.0),
            5.0,
            0.0,
        );
        let mut fcc = Fcc::new(0, Vec3::new(0.0, 5000.0, 100.0), 50.0);
        let dt = 0.01;
        for _ in 0..100 {
            step_aircraft(&mut vehicle, &mut fcc, dt, None);
        }
        // One second of straight, level flight at 50 m/s
        assert_abs_diff_eq!(vehicle.position().y, 50.0, epsilon = 0.1);
        assert_abs_diff_eq!(vehicle.position().x, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(vehicle.roll_angle(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_turn_converges_to_target_yaw() {
        let mut vehicle = Vehicle::new(
            0,
            Vec3::new(0.0, 0.0, 100.0),
            Vec3::new(0.0, 50.0, 0.0),
            5.0,
            0.0,
        );
        // Destination due east forces a 90° right turn
        let mut fcc = Fcc::new(0, Vec3::new(10_000.0, 0.0, 100.0), 50.0);
        let dt = 0.01;
        for _ in 0..3000 {
            step_aircraft(&mut vehicle, &mut fcc, dt, None);
        }
        // After 30 s the turn is complete and wings are level again
        assert_abs_diff_eq!(vehicle.yaw_angle(), fcc.target_yaw_angle(), epsilon = 1.0);
        assert!(vehicle.roll_angle().abs() < 5.0);
        assert!(vehicle.position().x > 500.0);
    }

    #[test]
    fn test_speed_converges_under_acceleration_limit() {
        let mut vehicle = Vehicle::new(
            0,
            Vec3::new(0.0, 0.0, 100.0),
            Vec3::new(0.0, 40.0, 0.0),
            5.0,
            0.0,
        );
        let mut fcc = Fcc::new(0, Vec3::new(0.0, 50_000.0, 100.0), 40.0);
        fcc.accelerate(10.0);
        let dt = 0.01;
        let mut previous_speed = vehicle.speed();
        for _ in 0..600 {
            step_aircraft(&mut vehicle, &mut fcc, dt, None);
            let speed = vehicle.speed();
            assert!(
                (speed - previous_speed).abs() <= MAX_ACCELERATION * dt + 1e-9,
                "acceleration limit exceeded: {previous_speed} -> {speed}"
            );
            previous_speed = speed;
        }
        // 10 m/s delta at 2 m/s² takes 5 s; 6 s is comfortably enough
        assert_abs_diff_eq!(vehicle.speed(), 50.0, epsilon = 1e-6);
    }

    #[test]
    fn test_head_on_contact_classified() {
        let first = Vehicle::new(
            0,
            Vec3::new(0.0, 0.0, 100.0),
            Vec3::new(0.0, 50.0, 0.0),
            5.0,
            0.0,
        );
        let second = Vehicle::new(
            1,
            Vec3::new(0.0, 8.0, 100.0),
            Vec3::new(0.0, -50.0, 0.0),
            5.0,
            0.0,
        );
        let contact = check_contact(&first, &second, 0.01).expect("contact expected");
        assert!(contact.head_on);
        assert!(contact.first_caused);
        assert!(contact.second_caused);
    }

    #[test]
    fn test_trailing_contact_blames_the_closing_aircraft() {
        // Chaser overtaking from behind: only its velocity points at the
        // other aircraft.
        let chaser = Vehicle::new(
            0,
            Vec3::new(0.0, 0.0, 100.0),
            Vec3::new(0.0, 60.0, 0.0),
            5.0,
            0.0,
        );
        let leader = Vehicle::new(
            1,
            Vec3::new(0.0, 8.0, 100.0),
            Vec3::new(0.0, 40.0, 0.0),
            5.0,
            0.0,
        );
        let contact = check_contact(&chaser, &leader, 0.01).expect("contact expected");
        assert!(contact.first_caused);
        assert!(!contact.second_caused);
    }

    #[test]
    fn test_grazing_contact_not_head_on() {
        let first = Vehicle::new(
            0,
            Vec3::new(0.0, 0.0, 100.0),
            Vec3::new(0.0, 50.0, 0.0),
            5.0,
            0.0,
        );
        // Crossing traffic clipping the sphere well off its closest point
        let second = Vehicle::new(
            1,
            Vec3::new(9.0, 0.0, 100.0),
            Vec3::new(50.0, 0.0, 0.0),
            5.0,
            0.0,
        );
        let contact = check_contact(&first, &second, 0.01).expect("contact expected");
        assert!(!contact.head_on);
    }

    #[test]
    fn test_separated_vehicles_no_contact() {
        let first = Vehicle::new(
            0,
            Vec3::new(0.0, 0.0, 100.0),
            Vec3::new(0.0, 50.0, 0.0),
            5.0,
            0.0,
        );
        let second = Vehicle::new(
            1,
            Vec3::new(200.0, 0.0, 100.0),
            Vec3::new(0.0, 50.0, 0.0),
            5.0,
            0.0,
        );
        assert!(check_contact(&first, &second, 0.01).is_none());
    }
}
