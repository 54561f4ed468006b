//! Entry point: dispatches the study modes over the engine.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use airprox_app::batch;
use airprox_app::cli::{Cli, Command};
use airprox_app::data;
use airprox_app::generator;
use airprox_core::error::SimError;
use airprox_core::events::{TelemetryEvent, TelemetrySink};
use airprox_core::records::{RunConfig, ScenarioRecord};
use airprox_core::types::Vec3;
use airprox_sim::clock::MonotonicClock;
use airprox_sim::runner::ScenarioRunner;

/// Poll interval of the realtime supervisor loop.
const SUPERVISOR_POLL: Duration = Duration::from_millis(200);

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        None => run_realtime(None, 0, true),
        Some(Command::Realtime { file, index, avoid }) => {
            run_realtime(file.as_deref(), index, avoid)
        }
        Some(Command::Headless) => run_headless(),
        Some(Command::Tests { count, seed }) => run_tests(count, seed),
        Some(Command::Ongoing) => run_ongoing(),
        Some(Command::Load { file, index }) => run_load(&file, index),
    }
}

/// The built-in demonstration scenario: a head-on pair five kilometers
/// apart at matched speed.
fn default_scenario() -> ScenarioRecord {
    let mut record = ScenarioRecord {
        test_id: 0,
        aircraft_angle: 0.0,
        initial_positions: [Vec3::new(0.0, 0.0, 1000.0), Vec3::new(0.0, 5000.0, 1000.0)],
        initial_velocities: [Vec3::new(0.0, 50.0, 0.0), Vec3::new(0.0, -50.0, 0.0)],
        initial_targets: [Vec3::new(0.0, 5000.0, 1000.0), Vec3::new(0.0, 0.0, 1000.0)],
        initial_roll_angles: [0.0, 0.0],
    };
    record.aircraft_angle = record.bearing_at_start();
    record
}

fn scenario_from(file: Option<&Path>, index: usize) -> Result<ScenarioRecord, Box<dyn Error>> {
    match file {
        Some(path) => Ok(data::load_row(path, index)?.record),
        None => Ok(default_scenario()),
    }
}

/// Console sink: the first aircraft's ADS-B report plus every conflict
/// and collision event.
fn console_telemetry() -> Arc<TelemetrySink> {
    Arc::new(|event: &TelemetryEvent| match event {
        TelemetryEvent::AdsbReport {
            aircraft_id: 0,
            position,
            speed,
            yaw_angle,
            target_yaw_angle,
            pitch_angle,
            roll_angle,
            target_roll_angle,
            distance_covered,
            adsb_cycles,
            physics_cycles,
        } => {
            println!(
                "aircraft 0; speed: {speed:.2}; x: {:.2}; y: {:.2}; z: {:.2}; \
                 yaw: {yaw_angle:.2}/{target_yaw_angle:.2}; pitch: {pitch_angle:.2}; \
                 roll: {roll_angle:.2}/{target_roll_angle:.2}; covered: {distance_covered:.2}; \
                 t: {adsb_cycles}; phys: {physics_cycles}",
                position.x, position.y, position.z
            );
        }
        TelemetryEvent::ConflictDetected {
            first_id,
            second_id,
            miss_distance,
            time_to_closest_approach,
        } => {
            println!(
                "conflict: {first_id} <-> {second_id}, projected miss {miss_distance:.1} m \
                 in {time_to_closest_approach:.1} s"
            );
        }
        TelemetryEvent::EvadeApplied {
            aircraft_id,
            waypoint,
        } => {
            println!(
                "evade: aircraft {aircraft_id} detours via ({:.0}, {:.0}, {:.0})",
                waypoint.x, waypoint.y, waypoint.z
            );
        }
        TelemetryEvent::Collision {
            first_id,
            second_id,
            position,
            head_on,
        } => {
            let kind = if *head_on { "head-on" } else { "collision" };
            println!(
                "{kind}: {first_id} <-> {second_id} at ({:.1}, {:.1}, {:.1})",
                position.x, position.y, position.z
            );
        }
        _ => {}
    })
}

fn run_realtime(file: Option<&Path>, index: usize, avoid: bool) -> Result<(), Box<dyn Error>> {
    let record = scenario_from(file, index)?;
    let config = RunConfig::default();
    let runner = ScenarioRunner::new(config).with_telemetry(console_telemetry());
    let session = runner.start_realtime(&record, avoid, Arc::new(MonotonicClock));
    let handles: Vec<_> = session.aircraft().to_vec();

    // Supervise: stop on collision, exhausted routes, or spent budget.
    let tick_budget = (config.duration_secs * config.physics_hz) as u64;
    loop {
        std::thread::sleep(SUPERVISOR_POLL);
        let state = session.state();
        if !state.is_running() || state.physics_cycles() >= tick_budget {
            break;
        }
        let all_done = handles.iter().all(|handle| {
            handle
                .fcc
                .lock()
                .map(|fcc| fcc.destinations().is_empty())
                .unwrap_or(true)
        });
        if all_done {
            info!("all destinations visited, stopping session");
            break;
        }
    }
    let summary = session.stop();

    println!("Time simulated: {:.2}s", summary.simulated_secs);
    if summary.time_paused_secs > 0.0 {
        println!(
            "Time elapsed: {:.2}s ({:.2}s with pauses)",
            summary.wall_secs, summary.wall_secs_with_pauses
        );
    } else {
        println!("Time elapsed: {:.2}s", summary.wall_secs);
    }
    println!("Time efficiency: {:.2}%", summary.efficiency_percent());
    if summary.collision {
        println!("Outcome: collision");
    } else {
        println!(
            "Outcome: no collision, minimum separation {:.1} m",
            summary.minimal_relative_distance
        );
    }

    for handle in &handles {
        let visited: Vec<Vec3> = handle
            .fcc
            .lock()
            .map(|fcc| fcc.visited().to_vec())
            .unwrap_or_default();
        data::export_visited(Path::new("logs/visited"), handle.aircraft_id(), &visited)?;
    }
    Ok(())
}

fn run_headless() -> Result<(), Box<dyn Error>> {
    let record = default_scenario();
    let runner = ScenarioRunner::new(RunConfig::default());
    for avoid in [false, true] {
        let result = runner.run_headless(&record, avoid);
        println!(
            "avoidance {}: collision = {}, minimum separation = {:.1} m, final a1 = \
             ({:.1}, {:.1}, {:.1}), final a2 = ({:.1}, {:.1}, {:.1})",
            if avoid { "on" } else { "off" },
            result.collision,
            result.minimal_relative_distance,
            result.final_positions[0].x,
            result.final_positions[0].y,
            result.final_positions[0].z,
            result.final_positions[1].x,
            result.final_positions[1].y,
            result.final_positions[1].z,
        );
    }
    Ok(())
}

fn run_tests(count: usize, seed: u64) -> Result<(), Box<dyn Error>> {
    let count = count.clamp(10, 100);
    let records: Vec<Result<ScenarioRecord, SimError>> =
        generator::generate(count, seed).into_iter().map(Ok).collect();
    let runner = ScenarioRunner::new(RunConfig::default());

    let output = data::timestamped_export_path(Path::new("."));
    let outcome = batch::run_batch(&records, &runner, &output)?;
    // The freshest batch becomes the active scenario file.
    std::fs::copy(&output, data::ACTIVE_SCENARIO_FILE)?;

    println!(
        "batch complete: {} passed, {} failed, results in {}",
        outcome.passed,
        outcome.failed,
        output.display()
    );
    Ok(())
}

fn run_ongoing() -> Result<(), Box<dyn Error>> {
    let active = PathBuf::from(data::ACTIVE_SCENARIO_FILE);
    if !active.exists() {
        info!("no active scenario file, seeding one");
        run_tests(10, 42)?;
    }
    loop {
        let records: Vec<Result<ScenarioRecord, SimError>> = data::read_rows(&active)?
            .into_iter()
            .map(|row| row.map(|r| r.record))
            .collect();
        let runner = ScenarioRunner::new(RunConfig::default());
        let output = data::timestamped_export_path(Path::new("."));
        let outcome = batch::run_batch(&records, &runner, &output)?;
        println!(
            "pass complete: {} passed, {} failed, results in {}",
            outcome.passed,
            outcome.failed,
            output.display()
        );
        if outcome.cancelled {
            return Ok(());
        }
    }
}

fn run_load(file: &Path, index: usize) -> Result<(), Box<dyn Error>> {
    let row = data::load_row(file, index)?;
    let runner = ScenarioRunner::new(RunConfig::default());
    let without_avoidance = runner.run_headless(&row.record, false);
    let with_avoidance = runner.run_headless(&row.record, true);

    let tolerance = 1e-3;
    let mut mismatches = Vec::new();
    for (label, replayed, recorded) in [
        (
            "final position (no avoidance)",
            without_avoidance.final_positions,
            row.outcomes.final_positions_noavoid,
        ),
        (
            "final position (avoidance)",
            with_avoidance.final_positions,
            row.outcomes.final_positions_avoid,
        ),
        (
            "final speed (no avoidance)",
            without_avoidance.final_velocities,
            row.outcomes.final_velocities_noavoid,
        ),
        (
            "final speed (avoidance)",
            with_avoidance.final_velocities,
            row.outcomes.final_velocities_avoid,
        ),
    ] {
        for aircraft in 0..2 {
            if replayed[aircraft].distance_to(&recorded[aircraft]) > tolerance {
                mismatches.push(format!("{label}, aircraft {}", aircraft + 1));
            }
        }
    }
    if without_avoidance.collision != row.outcomes.collision_noavoid {
        mismatches.push("collision flag (no avoidance)".into());
    }
    if with_avoidance.collision != row.outcomes.collision_avoid {
        mismatches.push("collision flag (avoidance)".into());
    }

    if mismatches.is_empty() {
        println!("scenario {index}: replay matches the recorded outcome");
    } else {
        println!("scenario {index}: replay diverged in {}", mismatches.join(", "));
    }
    Ok(())
}
