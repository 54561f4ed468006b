//! Seeded encounter generation for the `tests` batch mode.
//!
//! Scenarios are built around a common crossing point so most runs put
//! the pair on converging tracks within the study envelope: altitudes of
//! 1–7 km, speeds of 30–100 m/s, and a 10 km starting separation.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use airprox_core::records::ScenarioRecord;
use airprox_core::types::Vec3;

/// Starting distance between the pair (m).
const START_SEPARATION: f64 = 10_000.0;

/// How far beyond the crossing point each target sits (m).
const TARGET_OVERSHOOT: f64 = 20_000.0;

const MIN_ALTITUDE: f64 = 1_000.0;
const MAX_ALTITUDE: f64 = 7_000.0;
const MIN_SPEED: f64 = 30.0;
const MAX_SPEED: f64 = 100.0;

/// Generates `count` encounter scenarios. The same seed always yields
/// the same batch.
pub fn generate(count: usize, seed: u64) -> Vec<ScenarioRecord> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|index| generate_one(index as u32, &mut rng))
        .collect()
}

fn generate_one(test_id: u32, rng: &mut ChaCha8Rng) -> ScenarioRecord {
    let altitude = rng.gen_range(MIN_ALTITUDE..MAX_ALTITUDE);
    // Bearing from the first aircraft to the second at t = 0.
    let encounter_bearing = rng.gen_range(0.0..360.0_f64);
    let bearing_rad = encounter_bearing.to_radians();

    let first_position = Vec3::new(0.0, 0.0, altitude);
    let second_position = Vec3::new(
        START_SEPARATION * bearing_rad.sin(),
        START_SEPARATION * bearing_rad.cos(),
        altitude + rng.gen_range(-100.0..100.0),
    );

    // Both tracks run through a jittered midpoint, so arrival-time skew
    // comes only from the speed draw.
    let crossing = Vec3::new(
        (first_position.x + second_position.x) / 2.0 + rng.gen_range(-500.0..500.0),
        (first_position.y + second_position.y) / 2.0 + rng.gen_range(-500.0..500.0),
        altitude + rng.gen_range(-50.0..50.0),
    );

    let velocities_and_targets = [first_position, second_position].map(|position| {
        let speed = rng.gen_range(MIN_SPEED..MAX_SPEED);
        let to_crossing = crossing - position;
        let direction = to_crossing
            .normalized()
            .unwrap_or(Vec3::new(0.0, 1.0, 0.0));
        (direction * speed, crossing + direction * TARGET_OVERSHOOT)
    });

    ScenarioRecord {
        test_id,
        aircraft_angle: encounter_bearing,
        initial_positions: [first_position, second_position],
        initial_velocities: [velocities_and_targets[0].0, velocities_and_targets[1].0],
        initial_targets: [velocities_and_targets[0].1, velocities_and_targets[1].1],
        initial_roll_angles: [0.0, 0.0],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_same_seed_same_batch() {
        let first = generate(20, 7);
        let second = generate(20, 7);
        assert_eq!(first, second);
    }

    #[test]
    fn test_different_seeds_diverge() {
        assert_ne!(generate(5, 1), generate(5, 2));
    }

    #[test]
    fn test_generated_scenarios_within_envelope() {
        for record in generate(50, 42) {
            for position in record.initial_positions {
                assert!(position.z >= MIN_ALTITUDE - 100.0 && position.z <= MAX_ALTITUDE + 100.0);
            }
            for velocity in record.initial_velocities {
                let speed = velocity.length();
                assert!(
                    (MIN_SPEED..=MAX_SPEED).contains(&speed),
                    "speed {speed} outside envelope"
                );
            }
            let separation =
                record.initial_positions[0].distance_to(&record.initial_positions[1]);
            assert_abs_diff_eq!(separation, START_SEPARATION, epsilon = 150.0);
            assert_abs_diff_eq!(
                record.aircraft_angle,
                record.bearing_at_start(),
                epsilon = 1.0
            );
        }
    }

    #[test]
    fn test_ids_are_sequential() {
        let batch = generate(10, 3);
        for (index, record) in batch.iter().enumerate() {
            assert_eq!(record.test_id, index as u32);
        }
    }
}
