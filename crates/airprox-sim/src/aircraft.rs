//! Aircraft composition: one vehicle plus one FCC, and the shared handle
//! used by the realtime worker threads.

use std::sync::{Mutex, RwLock};

use airprox_core::constants::DEFAULT_VEHICLE_SIZE;
use airprox_core::records::ScenarioRecord;
use airprox_core::types::Vec3;

use crate::fcc::Fcc;
use crate::vehicle::Vehicle;

/// One simulated aircraft. The vehicle and FCC share an id; the initial
/// record is kept verbatim so [`Aircraft::reset`] is exact.
#[derive(Debug, Clone)]
pub struct Aircraft {
    vehicle: Vehicle,
    fcc: Fcc,
    initial_position: Vec3,
    initial_velocity: Vec3,
    initial_target: Vec3,
    initial_roll_angle: f64,
}

impl Aircraft {
    pub fn new(
        aircraft_id: u32,
        position: Vec3,
        velocity: Vec3,
        initial_target: Vec3,
        initial_roll_angle: f64,
    ) -> Self {
        let vehicle = Vehicle::new(
            aircraft_id,
            position,
            velocity,
            DEFAULT_VEHICLE_SIZE,
            initial_roll_angle,
        );
        let fcc = Fcc::new(aircraft_id, initial_target, velocity.length());
        Self {
            vehicle,
            fcc,
            initial_position: position,
            initial_velocity: velocity,
            initial_target,
            initial_roll_angle,
        }
    }

    /// Builds the two aircraft a scenario record describes.
    pub fn pair_from_record(record: &ScenarioRecord) -> [Aircraft; 2] {
        [0usize, 1].map(|i| {
            Aircraft::new(
                i as u32,
                record.initial_positions[i],
                record.initial_velocities[i],
                record.initial_targets[i],
                record.initial_roll_angles[i],
            )
        })
    }

    pub fn vehicle(&self) -> &Vehicle {
        &self.vehicle
    }

    pub fn vehicle_mut(&mut self) -> &mut Vehicle {
        &mut self.vehicle
    }

    pub fn fcc(&self) -> &Fcc {
        &self.fcc
    }

    pub fn fcc_mut(&mut self) -> &mut Fcc {
        &mut self.fcc
    }

    /// Vehicle and FCC borrowed together, for callers that update both.
    pub fn parts_mut(&mut self) -> (&mut Vehicle, &mut Fcc) {
        (&mut self.vehicle, &mut self.fcc)
    }

    pub fn initial_position(&self) -> Vec3 {
        self.initial_position
    }

    pub fn initial_velocity(&self) -> Vec3 {
        self.initial_velocity
    }

    pub fn initial_target(&self) -> Vec3 {
        self.initial_target
    }

    pub fn initial_speed(&self) -> f64 {
        self.initial_velocity.length()
    }

    pub fn initial_roll_angle(&self) -> f64 {
        self.initial_roll_angle
    }

    /// Restores the exact initial record: pose, velocity, roll, and the
    /// initial target as the sole queued destination.
    pub fn reset(&mut self) {
        self.vehicle = Vehicle::new(
            self.vehicle.aircraft_id(),
            self.initial_position,
            self.initial_velocity,
            self.vehicle.size(),
            self.initial_roll_angle,
        );
        self.fcc.reset(self.initial_velocity.length());
    }
}

/// Shared form of an aircraft for the threaded realtime mode.
///
/// The physics worker is the only vehicle writer; the ADS-B worker takes
/// the read lock just long enough to copy a snapshot. FCC writers (the
/// physics tick and the ADS-B resolution) serialize on the mutex. Neither
/// lock is ever held across a sleep.
#[derive(Debug)]
pub struct AircraftHandle {
    aircraft_id: u32,
    pub vehicle: RwLock<Vehicle>,
    pub fcc: Mutex<Fcc>,
    initial: Aircraft,
}

impl AircraftHandle {
    pub fn new(aircraft: Aircraft) -> Self {
        Self {
            aircraft_id: aircraft.vehicle().aircraft_id(),
            vehicle: RwLock::new(aircraft.vehicle().clone()),
            fcc: Mutex::new(aircraft.fcc().clone()),
            initial: aircraft,
        }
    }

    pub fn aircraft_id(&self) -> u32 {
        self.aircraft_id
    }

    /// Restores both halves to the initial record.
    pub fn reset(&self) {
        let mut fresh = self.initial.clone();
        fresh.reset();
        *self.vehicle.write().expect("vehicle lock poisoned") = fresh.vehicle().clone();
        *self.fcc.lock().expect("fcc lock poisoned") = fresh.fcc().clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_reset_restores_exact_initial_state() {
        let mut aircraft = Aircraft::new(
            0,
            Vec3::new(0.0, 0.0, 100.0),
            Vec3::new(0.0, 50.0, 0.0),
            Vec3::new(0.0, 5000.0, 100.0),
            10.0,
        );

        aircraft.vehicle_mut().move_by(100.0, 250.0, 5.0);
        aircraft.vehicle_mut().roll(35.0);
        aircraft.fcc_mut().accelerate(25.0);
        aircraft.fcc_mut().append_visited(Vec3::new(1.0, 1.0, 1.0));

        aircraft.reset();
        assert_eq!(aircraft.vehicle().position(), Vec3::new(0.0, 0.0, 100.0));
        assert_eq!(aircraft.vehicle().velocity(), Vec3::new(0.0, 50.0, 0.0));
        assert_abs_diff_eq!(aircraft.vehicle().roll_angle(), 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(aircraft.vehicle().distance_covered(), 0.0, epsilon = 1e-12);
        assert_eq!(aircraft.fcc().destinations().len(), 1);
        assert_eq!(
            *aircraft.fcc().destinations().front().unwrap(),
            Vec3::new(0.0, 5000.0, 100.0)
        );
        assert_abs_diff_eq!(aircraft.fcc().target_speed(), 50.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pair_from_record_assigns_ids() {
        let record = ScenarioRecord {
            test_id: 0,
            aircraft_angle: 0.0,
            initial_positions: [Vec3::new(0.0, 0.0, 100.0), Vec3::new(0.0, 5000.0, 100.0)],
            initial_velocities: [Vec3::new(0.0, 50.0, 0.0), Vec3::new(0.0, -50.0, 0.0)],
            initial_targets: [Vec3::new(0.0, 5000.0, 100.0), Vec3::new(0.0, 0.0, 100.0)],
            initial_roll_angles: [0.0, 0.0],
        };
        let pair = Aircraft::pair_from_record(&record);
        assert_eq!(pair[0].vehicle().aircraft_id(), 0);
        assert_eq!(pair[1].vehicle().aircraft_id(), 1);
        assert_eq!(pair[1].initial_target(), Vec3::new(0.0, 0.0, 100.0));
    }

    #[test]
    fn test_handle_reset() {
        let aircraft = Aircraft::new(
            1,
            Vec3::new(10.0, 10.0, 100.0),
            Vec3::new(50.0, 0.0, 0.0),
            Vec3::new(5000.0, 10.0, 100.0),
            0.0,
        );
        let handle = AircraftHandle::new(aircraft);
        handle
            .vehicle
            .write()
            .unwrap()
            .move_by(500.0, 0.0, 0.0);
        handle.reset();
        assert_eq!(
            handle.vehicle.read().unwrap().position(),
            Vec3::new(10.0, 10.0, 100.0)
        );
    }
}
