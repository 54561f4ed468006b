//! Engine-level tests: the study scenarios end to end, the quantified
//! flight-envelope invariants, and the realtime session lifecycle.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use approx::assert_abs_diff_eq;

use airprox_core::constants::{MAX_ACCELERATION, MAX_PITCH_ANGLE, MAX_ROLL_ANGLE, G_ACCELERATION};
use airprox_core::events::TelemetryEvent;
use airprox_core::records::{RunConfig, ScenarioRecord};
use airprox_core::state::SimulationState;
use airprox_core::types::Vec3;

use crate::aircraft::Aircraft;
use crate::clock::{ManualClock, MonotonicClock};
use crate::fcc::Fcc;
use crate::runner::ScenarioRunner;
use crate::systems::adsb::{self, AdsbObservation};
use crate::systems::physics;

fn record(
    positions: [Vec3; 2],
    velocities: [Vec3; 2],
    targets: [Vec3; 2],
) -> ScenarioRecord {
    let mut record = ScenarioRecord {
        test_id: 0,
        aircraft_angle: 0.0,
        initial_positions: positions,
        initial_velocities: velocities,
        initial_targets: targets,
        initial_roll_angles: [0.0, 0.0],
    };
    record.aircraft_angle = record.bearing_at_start();
    record
}

fn head_on_record() -> ScenarioRecord {
    record(
        [Vec3::new(0.0, 0.0, 100.0), Vec3::new(0.0, 5000.0, 100.0)],
        [Vec3::new(0.0, 50.0, 0.0), Vec3::new(0.0, -50.0, 0.0)],
        [Vec3::new(0.0, 5000.0, 100.0), Vec3::new(0.0, 0.0, 100.0)],
    )
}

fn trailing_record() -> ScenarioRecord {
    record(
        [Vec3::new(0.0, 0.0, 100.0), Vec3::new(0.0, 500.0, 100.0)],
        [Vec3::new(0.0, 60.0, 0.0), Vec3::new(0.0, 40.0, 0.0)],
        [Vec3::new(0.0, 50_000.0, 100.0), Vec3::new(0.0, 50_000.0, 100.0)],
    )
}

fn parallel_record() -> ScenarioRecord {
    record(
        [Vec3::new(0.0, 0.0, 100.0), Vec3::new(200.0, 0.0, 100.0)],
        [Vec3::new(0.0, 50.0, 0.0), Vec3::new(0.0, 50.0, 0.0)],
        [Vec3::new(0.0, 50_000.0, 100.0), Vec3::new(200.0, 50_000.0, 100.0)],
    )
}

/// Drives the cooperative loop by hand so per-tick state stays
/// observable. Returns true on collision.
fn run_manual(
    aircraft: &mut [Aircraft; 2],
    state: &SimulationState,
    config: &RunConfig,
    secs: f64,
    mut per_tick: impl FnMut(&[Aircraft; 2]),
) -> bool {
    let dt = config.physics_dt();
    let ticks = (secs * config.physics_hz).round() as u64;
    let ticks_per_cycle = config.physics_ticks_per_adsb_cycle();
    for tick in 0..ticks {
        if tick % ticks_per_cycle == 0 {
            let observations: Vec<AdsbObservation> = aircraft
                .iter()
                .map(|a| AdsbObservation::of(a.vehicle()))
                .collect();
            let mut fccs: Vec<&mut Fcc> = aircraft.iter_mut().map(|a| a.fcc_mut()).collect();
            adsb::run_cycle(&observations, &mut fccs, state, config.conflict_horizon_secs, None);
        }
        if physics::tick(aircraft.as_mut_slice(), state, dt, None) {
            return true;
        }
        per_tick(aircraft);
    }
    false
}

// ---- Study scenarios ----

#[test]
fn test_head_on_without_avoidance_collides() {
    let runner = ScenarioRunner::new(RunConfig::default());
    let result = runner.run_headless(&head_on_record(), false);
    assert!(result.collision, "head-on pair must collide unprotected");
    assert!(
        result.minimal_relative_distance < 10.0,
        "expected contact-range minimum, got {:.1} m",
        result.minimal_relative_distance
    );
}

#[test]
fn test_head_on_with_avoidance_keeps_separation() {
    let config = RunConfig {
        duration_secs: 400.0,
        ..RunConfig::default()
    };
    let runner = ScenarioRunner::new(config);
    let result = runner.run_headless(&head_on_record(), true);
    assert!(!result.collision, "avoidance must prevent the head-on collision");
    assert!(
        result.minimal_relative_distance >= 50.0,
        "safe zone violated: minimum separation {:.1} m",
        result.minimal_relative_distance
    );
}

#[test]
fn test_trailing_catch_up_without_avoidance_collides() {
    let runner = ScenarioRunner::new(RunConfig::default());
    let result = runner.run_headless(&trailing_record(), false);
    assert!(result.collision);
    // 20 m/s closure over a 490 m gap: contact near t = 24.5 s, with the
    // chaser around y = 1470 m.
    assert!(
        result.final_positions[0].y > 1200.0 && result.final_positions[0].y < 1700.0,
        "unexpected contact point y = {:.0}",
        result.final_positions[0].y
    );
}

#[test]
fn test_trailing_catch_up_with_avoidance_diverges() {
    let config = RunConfig {
        duration_secs: 60.0,
        ..RunConfig::default()
    };
    let runner = ScenarioRunner::new(config);
    let result = runner.run_headless(&trailing_record(), true);
    assert!(!result.collision);
    assert!(
        result.minimal_relative_distance >= 50.0,
        "safe zone violated: {:.1} m",
        result.minimal_relative_distance
    );
    let lateral = (result.final_positions[0].x - result.final_positions[1].x).abs();
    assert!(
        lateral >= 50.0,
        "expected lateral divergence, got {lateral:.1} m"
    );
}

#[test]
fn test_oblique_crossing_with_avoidance_no_collision() {
    let oblique = record(
        [Vec3::new(0.0, 0.0, 100.0), Vec3::new(3500.0, 3500.0, 100.0)],
        [
            Vec3::new(0.0, 50.0, 0.0),
            Vec3::new(-35.36, -35.36, 0.0),
        ],
        [
            Vec3::new(0.0, 7000.0, 100.0),
            Vec3::new(-3500.0, -3500.0, 100.0),
        ],
    );
    let config = RunConfig {
        duration_secs: 200.0,
        ..RunConfig::default()
    };
    let runner = ScenarioRunner::new(config);
    let result = runner.run_headless(&oblique, true);
    assert!(!result.collision);
}

#[test]
fn test_climb_descent_crossing_respects_envelopes() {
    let crossing = record(
        [Vec3::new(0.0, 0.0, 50.0), Vec3::new(0.0, 5000.0, 150.0)],
        [Vec3::new(0.0, 50.0, 5.0), Vec3::new(0.0, -50.0, -5.0)],
        [Vec3::new(0.0, 5000.0, 150.0), Vec3::new(0.0, 0.0, 50.0)],
    );
    let mut aircraft = Aircraft::pair_from_record(&crossing);
    let state = SimulationState::new(false, true, 50.0);
    let config = RunConfig::default();

    let collided = run_manual(&mut aircraft, &state, &config, 150.0, |aircraft| {
        for craft in aircraft {
            assert!(
                craft.vehicle().pitch_angle().abs() <= MAX_PITCH_ANGLE + 1e-6,
                "pitch envelope violated"
            );
            assert!(
                craft.fcc().target_pitch_angle().abs() <= MAX_PITCH_ANGLE + 1e-9,
                "pitch setpoint out of envelope"
            );
        }
    });
    assert!(!collided);
    assert!(
        state.minimal_relative_distance() >= 50.0,
        "safe zone violated: {:.1} m",
        state.minimal_relative_distance()
    );
}

#[test]
fn test_parallel_courses_issue_no_maneuver() {
    let conflicts = Arc::new(AtomicUsize::new(0));
    let observed = Arc::clone(&conflicts);
    let config = RunConfig {
        duration_secs: 60.0,
        ..RunConfig::default()
    };
    let runner = ScenarioRunner::new(config).with_telemetry(Arc::new(move |event| {
        if matches!(
            event,
            TelemetryEvent::ConflictDetected { .. } | TelemetryEvent::EvadeApplied { .. }
        ) {
            observed.fetch_add(1, Ordering::SeqCst);
        }
    }));
    let result = runner.run_headless(&parallel_record(), true);
    assert!(!result.collision);
    assert_eq!(
        conflicts.load(Ordering::SeqCst),
        0,
        "no conflict may be declared for parallel traffic"
    );
    assert_abs_diff_eq!(result.minimal_relative_distance, 200.0, epsilon = 1.0);
}

#[test]
fn test_parallel_courses_leave_queues_untouched() {
    let mut aircraft = Aircraft::pair_from_record(&parallel_record());
    let state = SimulationState::new(false, true, 50.0);
    let config = RunConfig::default();
    let collided = run_manual(&mut aircraft, &state, &config, 60.0, |aircraft| {
        for craft in aircraft {
            assert!(!craft.fcc().evade_maneuver());
        }
    });
    assert!(!collided);
    for craft in &aircraft {
        assert_eq!(craft.fcc().destinations().len(), 1);
        assert!(craft.fcc().destinations_history().is_empty());
    }
}

#[test]
fn test_reset_round_trip_after_partial_run() {
    let mut aircraft = Aircraft::pair_from_record(&head_on_record());
    let state = SimulationState::new(false, true, 50.0);
    let config = RunConfig::default();
    run_manual(&mut aircraft, &state, &config, 10.0, |_| {});

    for craft in &mut aircraft {
        craft.reset();
    }
    let fresh = Aircraft::pair_from_record(&head_on_record());
    for (restored, reference) in aircraft.iter().zip(fresh.iter()) {
        assert_eq!(restored.vehicle().position(), reference.vehicle().position());
        assert_eq!(restored.vehicle().velocity(), reference.vehicle().velocity());
        assert_abs_diff_eq!(
            restored.vehicle().roll_angle(),
            reference.vehicle().roll_angle(),
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(restored.vehicle().distance_covered(), 0.0, epsilon = 1e-12);
        assert_eq!(restored.fcc().destinations(), reference.fcc().destinations());
        assert_abs_diff_eq!(
            restored.fcc().target_speed(),
            reference.fcc().target_speed(),
            epsilon = 1e-12
        );
    }
}

// ---- Boundary behaviors ----

#[test]
fn test_identical_positions_collide_immediately() {
    let coincident = record(
        [Vec3::new(0.0, 0.0, 100.0), Vec3::new(0.0, 0.0, 100.0)],
        [Vec3::new(0.0, 50.0, 0.0), Vec3::new(0.0, -50.0, 0.0)],
        [Vec3::new(0.0, 5000.0, 100.0), Vec3::new(0.0, -5000.0, 100.0)],
    );
    let runner = ScenarioRunner::new(RunConfig::default());
    let result = runner.run_headless(&coincident, false);
    assert!(result.collision);
    assert!(result.minimal_relative_distance < 10.0);
}

#[test]
fn test_forced_collision_flags_drive_pursuit() {
    // Parallel offset traffic never meets on its own; the forced-collision
    // flag steers the faster aircraft into its slower opponent.
    let chase = record(
        [Vec3::new(0.0, 0.0, 100.0), Vec3::new(500.0, 0.0, 100.0)],
        [Vec3::new(0.0, 50.0, 0.0), Vec3::new(0.0, 30.0, 0.0)],
        [Vec3::new(0.0, 50_000.0, 100.0), Vec3::new(500.0, 50_000.0, 100.0)],
    );
    let mut aircraft = Aircraft::pair_from_record(&chase);
    let state = SimulationState::new(false, false, 50.0);
    state.set_cause_collision(0, true);
    let config = RunConfig::default();
    let collided = run_manual(&mut aircraft, &state, &config, 180.0, |_| {});
    assert!(collided, "pursuit must run the opponent down");
}

// ---- Quantified invariants ----

#[test]
fn test_flight_envelope_invariants_through_avoidance() {
    let mut aircraft = Aircraft::pair_from_record(&head_on_record());
    let state = SimulationState::new(false, true, 50.0);
    let config = RunConfig::default();
    let dt = config.physics_dt();

    let mut previous: Vec<(f64, f64, f64, f64)> = aircraft
        .iter()
        .map(|a| {
            (
                a.vehicle().speed(),
                a.vehicle().yaw_angle(),
                a.vehicle().horizontal_speed(),
                a.vehicle().distance_covered(),
            )
        })
        .collect();

    run_manual(&mut aircraft, &state, &config, 120.0, |aircraft| {
        for (index, craft) in aircraft.iter().enumerate() {
            let vehicle = craft.vehicle();
            assert!(
                vehicle.roll_angle().abs() <= MAX_ROLL_ANGLE + 1e-9,
                "roll envelope violated"
            );

            let (speed_before, yaw_before, h_speed_before, covered_before) = previous[index];
            let speed_delta = (vehicle.speed() - speed_before).abs();
            assert!(
                speed_delta <= MAX_ACCELERATION * dt + 1e-9,
                "acceleration bound violated: {speed_delta}"
            );

            if h_speed_before > 1.0 {
                let yaw_delta = airprox_core::types::format_yaw_angle(
                    vehicle.yaw_angle() - yaw_before,
                )
                .abs();
                let bound = (G_ACCELERATION
                    * vehicle.roll_angle().to_radians().tan().abs()
                    / h_speed_before)
                    .to_degrees()
                    * dt;
                assert!(
                    yaw_delta <= bound + 1e-6,
                    "turn-rate bound violated: {yaw_delta} > {bound}"
                );
            }

            assert!(
                vehicle.distance_covered() >= covered_before,
                "distance covered must be non-decreasing"
            );
            previous[index] = (
                vehicle.speed(),
                vehicle.yaw_angle(),
                vehicle.horizontal_speed(),
                vehicle.distance_covered(),
            );
        }
    });
}

// ---- Realtime session ----

#[test]
fn test_realtime_session_stops_on_collision() {
    let runner = ScenarioRunner::new(RunConfig::default());
    let session = runner.start_realtime(&head_on_record(), false, Arc::new(ManualClock::new()));
    let summary = session.wait();
    assert!(summary.collision);
    // Contact after ~49.9 simulated seconds at 100 Hz
    assert!(
        summary.physics_cycles > 4_000 && summary.physics_cycles < 6_500,
        "unexpected cycle count {}",
        summary.physics_cycles
    );
}

#[test]
fn test_realtime_session_external_stop() {
    let runner = ScenarioRunner::new(RunConfig::default());
    let session = runner.start_realtime(&parallel_record(), true, Arc::new(MonotonicClock));
    std::thread::sleep(Duration::from_millis(120));
    let summary = session.stop();
    assert!(!summary.collision);
    assert!(summary.physics_cycles > 0);
    assert!(summary.simulated_secs > 0.0);
    assert_eq!(summary.time_paused_secs, 0.0);
}
