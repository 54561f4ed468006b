//! The physical airframe: pose, velocity, and bank state.
//!
//! A vehicle has no behavior of its own. The physics loop is its only
//! writer; everything else observes it through the accessors or a clone.

use airprox_core::constants::MAX_ROLL_ANGLE;
use airprox_core::types::Vec3;

/// Physical state of one aircraft.
#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    aircraft_id: u32,
    position: Vec3,
    velocity: Vec3,
    /// Bounding-sphere radius (m), also the destination-reached threshold.
    size: f64,
    roll_angle: f64,
    initial_roll_angle: f64,
    distance_covered: f64,
}

impl Vehicle {
    /// Creates a vehicle at the given pose. Negative altitudes are lifted
    /// to ground level; the initial roll is clamped to the envelope.
    pub fn new(aircraft_id: u32, position: Vec3, velocity: Vec3, size: f64, roll_angle: f64) -> Self {
        let position = if position.z < 0.0 {
            Vec3::new(position.x, position.y, 0.0)
        } else {
            position
        };
        let roll_angle = roll_angle.clamp(-MAX_ROLL_ANGLE, MAX_ROLL_ANGLE);
        Self {
            aircraft_id,
            position,
            velocity,
            size,
            roll_angle,
            initial_roll_angle: roll_angle,
            distance_covered: 0.0,
        }
    }

    pub fn aircraft_id(&self) -> u32 {
        self.aircraft_id
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn roll_angle(&self) -> f64 {
        self.roll_angle
    }

    pub fn initial_roll_angle(&self) -> f64 {
        self.initial_roll_angle
    }

    /// Total path length flown (m). Non-decreasing.
    pub fn distance_covered(&self) -> f64 {
        self.distance_covered
    }

    /// Speed magnitude (m/s).
    pub fn speed(&self) -> f64 {
        self.velocity.length()
    }

    /// Speed over ground, ignoring the vertical component (m/s).
    pub fn horizontal_speed(&self) -> f64 {
        self.velocity.horizontal_length()
    }

    /// Heading in degrees, clockwise from North, `[0, 360)`.
    pub fn yaw_angle(&self) -> f64 {
        self.velocity.yaw_angle()
    }

    /// Climb angle in degrees.
    pub fn pitch_angle(&self) -> f64 {
        self.velocity.pitch_angle()
    }

    /// Translates the vehicle and accrues the covered distance.
    pub fn move_by(&mut self, dx: f64, dy: f64, dz: f64) {
        let delta = Vec3::new(dx, dy, dz);
        self.position += delta;
        self.distance_covered += delta.length();
    }

    /// Applies a roll delta, clamped to the ±90° envelope.
    pub fn roll(&mut self, d_angle: f64) {
        self.roll_angle = (self.roll_angle + d_angle).clamp(-MAX_ROLL_ANGLE, MAX_ROLL_ANGLE);
    }

    /// Replaces the velocity vector. Reserved for the physics step, which
    /// rebuilds it from the commanded speed, yaw, and pitch each tick.
    pub(crate) fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn level_vehicle() -> Vehicle {
        Vehicle::new(0, Vec3::new(0.0, 0.0, 100.0), Vec3::new(0.0, 50.0, 0.0), 5.0, 0.0)
    }

    #[test]
    fn test_move_accrues_distance() {
        let mut vehicle = level_vehicle();
        vehicle.move_by(3.0, 4.0, 0.0);
        vehicle.move_by(0.0, 0.0, 2.0);
        assert_eq!(vehicle.position(), Vec3::new(3.0, 4.0, 102.0));
        assert_abs_diff_eq!(vehicle.distance_covered(), 7.0, epsilon = 1e-12);
    }

    #[test]
    fn test_roll_clamps_to_envelope() {
        let mut vehicle = level_vehicle();
        vehicle.roll(120.0);
        assert_abs_diff_eq!(vehicle.roll_angle(), 90.0, epsilon = 1e-12);
        vehicle.roll(-250.0);
        assert_abs_diff_eq!(vehicle.roll_angle(), -90.0, epsilon = 1e-12);
    }

    #[test]
    fn test_negative_altitude_lifted() {
        let vehicle = Vehicle::new(1, Vec3::new(5.0, 5.0, -30.0), Vec3::zero(), 5.0, 0.0);
        assert_abs_diff_eq!(vehicle.position().z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_derived_angles() {
        let vehicle = Vehicle::new(
            0,
            Vec3::zero(),
            Vec3::new(30.0, 0.0, 30.0),
            5.0,
            0.0,
        );
        assert_abs_diff_eq!(vehicle.yaw_angle(), 90.0, epsilon = 1e-9);
        assert_abs_diff_eq!(vehicle.pitch_angle(), 45.0, epsilon = 1e-9);
        assert_abs_diff_eq!(vehicle.horizontal_speed(), 30.0, epsilon = 1e-9);
    }
}
