//! Scenario drivers: the cooperative headless runner used for batch
//! studies, and the threaded realtime session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use tracing::info;

use airprox_core::events::TelemetrySink;
use airprox_core::records::{RunConfig, ScenarioRecord, ScenarioResult};
use airprox_core::state::SimulationState;

use crate::aircraft::{Aircraft, AircraftHandle};
use crate::clock::Clock;
use crate::fcc::Fcc;
use crate::systems::adsb::{self, AdsbObservation};
use crate::systems::physics;
use crate::workers::{self, TickLock};

/// Drives scenario runs with one fixed configuration.
pub struct ScenarioRunner {
    config: RunConfig,
    telemetry: Option<Arc<TelemetrySink>>,
    stop: Arc<AtomicBool>,
}

impl ScenarioRunner {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            telemetry: None,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Registers an observer for telemetry events.
    pub fn with_telemetry(mut self, sink: Arc<TelemetrySink>) -> Self {
        self.telemetry = Some(sink);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// External stop signal shared by all runs of this runner.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Runs one scenario to completion on the calling thread, preserving
    /// the configured physics-to-ADS-B cadence ratio.
    ///
    /// Terminates when the simulated-time budget is spent, a collision is
    /// registered, every destination queue has been exhausted, or the
    /// external stop is raised. A stopped run still yields a valid
    /// result.
    pub fn run_headless(&self, record: &ScenarioRecord, avoid_collisions: bool) -> ScenarioResult {
        let mut aircraft = Aircraft::pair_from_record(record);
        let state = SimulationState::new(false, avoid_collisions, self.config.minimum_separation);
        let dt = self.config.physics_dt();
        let total_ticks = (self.config.duration_secs * self.config.physics_hz).round() as u64;
        let ticks_per_cycle = self.config.physics_ticks_per_adsb_cycle();
        let telemetry = self.telemetry.as_deref();

        info!(
            test_id = record.test_id,
            avoid_collisions, "starting headless run"
        );
        for tick in 0..total_ticks {
            if self.stop.load(Ordering::SeqCst) {
                info!("headless run stopped on request");
                break;
            }
            // The observer sees the state strictly before this tick.
            if tick % ticks_per_cycle == 0 {
                let observations: Vec<AdsbObservation> = aircraft
                    .iter()
                    .map(|a| AdsbObservation::of(a.vehicle()))
                    .collect();
                let mut fccs: Vec<&mut Fcc> =
                    aircraft.iter_mut().map(|a| a.fcc_mut()).collect();
                adsb::run_cycle(
                    &observations,
                    &mut fccs,
                    &state,
                    self.config.conflict_horizon_secs,
                    telemetry,
                );
            }
            if physics::tick(&mut aircraft, &state, dt, telemetry) {
                info!(test_id = record.test_id, "headless run ended in collision");
                break;
            }
            if aircraft.iter().all(|a| a.fcc().destinations().is_empty()) {
                info!(
                    test_id = record.test_id,
                    "headless run ended with all destinations visited"
                );
                break;
            }
        }

        ScenarioResult {
            record: *record,
            final_positions: [
                aircraft[0].vehicle().position(),
                aircraft[1].vehicle().position(),
            ],
            final_velocities: [
                aircraft[0].vehicle().velocity(),
                aircraft[1].vehicle().velocity(),
            ],
            collision: state.collision(),
            minimal_relative_distance: state.minimal_relative_distance(),
            physics_hz: self.config.physics_hz,
        }
    }

    /// Starts the two worker threads and hands back the live session.
    pub fn start_realtime(
        &self,
        record: &ScenarioRecord,
        avoid_collisions: bool,
        clock: Arc<dyn Clock>,
    ) -> RealtimeSession {
        let aircraft: Vec<Arc<AircraftHandle>> = Aircraft::pair_from_record(record)
            .into_iter()
            .map(|a| Arc::new(AircraftHandle::new(a)))
            .collect();
        let state = Arc::new(SimulationState::new(
            true,
            avoid_collisions,
            self.config.minimum_separation,
        ));

        info!(test_id = record.test_id, "starting realtime session");
        let tick_lock = TickLock::default();
        let physics_worker = workers::spawn_physics_worker(
            aircraft.clone(),
            Arc::clone(&state),
            self.config,
            Arc::clone(&clock),
            Arc::clone(&tick_lock),
            self.telemetry.clone(),
        );
        let adsb_worker = workers::spawn_adsb_worker(
            aircraft.clone(),
            Arc::clone(&state),
            self.config,
            Arc::clone(&clock),
            Arc::clone(&tick_lock),
            self.telemetry.clone(),
        );

        RealtimeSession {
            aircraft,
            state,
            config: self.config,
            started: clock.now(),
            clock,
            workers: vec![physics_worker, adsb_worker],
        }
    }
}

/// A running realtime simulation: two worker threads plus the shared
/// state they communicate through.
pub struct RealtimeSession {
    aircraft: Vec<Arc<AircraftHandle>>,
    state: Arc<SimulationState>,
    config: RunConfig,
    started: Instant,
    clock: Arc<dyn Clock>,
    workers: Vec<JoinHandle<()>>,
}

impl RealtimeSession {
    pub fn state(&self) -> &Arc<SimulationState> {
        &self.state
    }

    pub fn aircraft(&self) -> &[Arc<AircraftHandle>] {
        &self.aircraft
    }

    pub fn toggle_pause(&self) {
        self.state.toggle_pause(self.clock.now());
    }

    pub fn demand_reset(&self) {
        self.state.demand_reset();
    }

    /// Blocks until both workers exit (collision or external stop).
    pub fn wait(self) -> SessionSummary {
        self.join()
    }

    /// Raises the stop signal and waits the workers out. Each exits
    /// within one of its tick periods.
    pub fn stop(self) -> SessionSummary {
        self.state.request_stop();
        self.join()
    }

    fn join(self) -> SessionSummary {
        for worker in self.workers {
            let _ = worker.join();
        }
        if self.state.is_paused() {
            self.state.append_paused_time(self.clock.now());
        }
        let wall_with_pauses = self.clock.now().duration_since(self.started).as_secs_f64();
        let paused = self.state.time_paused().as_secs_f64();
        let summary = SessionSummary {
            simulated_secs: self.state.physics_cycles() as f64 * self.config.physics_dt(),
            wall_secs: wall_with_pauses - paused,
            wall_secs_with_pauses: wall_with_pauses,
            time_paused_secs: paused,
            collision: self.state.collision(),
            minimal_relative_distance: self.state.minimal_relative_distance(),
            physics_cycles: self.state.physics_cycles(),
            adsb_cycles: self.state.adsb_cycles(),
            skipped_ticks: self.state.skipped_ticks(),
        };
        info!(
            simulated_secs = summary.simulated_secs,
            wall_secs = summary.wall_secs,
            efficiency = summary.efficiency_percent(),
            "realtime session finished"
        );
        summary
    }
}

/// Accounting for a finished realtime session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSummary {
    pub simulated_secs: f64,
    /// Wall time excluding pauses.
    pub wall_secs: f64,
    pub wall_secs_with_pauses: f64,
    pub time_paused_secs: f64,
    pub collision: bool,
    pub minimal_relative_distance: f64,
    pub physics_cycles: u64,
    pub adsb_cycles: u64,
    pub skipped_ticks: u64,
}

impl SessionSummary {
    /// Simulated over real time, as a percentage.
    pub fn efficiency_percent(&self) -> f64 {
        if self.wall_secs > 0.0 {
            self.simulated_secs / self.wall_secs * 100.0
        } else {
            0.0
        }
    }
}
