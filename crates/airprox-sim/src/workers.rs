//! Worker threads for the realtime mode.
//!
//! The physics worker and the ADS-B worker pace themselves off the same
//! injected monotonic clock at their own cadences. Stop is cooperative:
//! both poll the shared running flag and exit within one tick period.

use std::sync::{Arc, RwLock};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, warn};

use airprox_core::error::SimError;
use airprox_core::events::TelemetrySink;
use airprox_core::records::RunConfig;
use airprox_core::state::SimulationState;
use airprox_core::types::Vec3;

use crate::aircraft::AircraftHandle;
use crate::clock::Clock;
use crate::systems::adsb::{self, AdsbObservation};
use crate::systems::physics;
use crate::vehicle::Vehicle;

/// Poll interval while paused.
const PAUSE_POLL: Duration = Duration::from_millis(50);

/// Tick barrier: the physics worker holds the write side across a whole
/// tick, the ADS-B worker the read side across its snapshot copy, so an
/// observer sees the fleet strictly before or strictly after a tick.
pub type TickLock = Arc<RwLock<()>>;

/// Spawns the high-rate physics worker.
pub fn spawn_physics_worker(
    aircraft: Vec<Arc<AircraftHandle>>,
    state: Arc<SimulationState>,
    config: RunConfig,
    clock: Arc<dyn Clock>,
    tick_lock: TickLock,
    telemetry: Option<Arc<TelemetrySink>>,
) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name("airprox-physics".into())
        .spawn(move || {
            physics_loop(
                &aircraft,
                &state,
                &config,
                &*clock,
                &tick_lock,
                telemetry.as_deref(),
            )
        })
        .expect("failed to spawn physics worker")
}

/// Spawns the low-rate ADS-B worker.
pub fn spawn_adsb_worker(
    aircraft: Vec<Arc<AircraftHandle>>,
    state: Arc<SimulationState>,
    config: RunConfig,
    clock: Arc<dyn Clock>,
    tick_lock: TickLock,
    telemetry: Option<Arc<TelemetrySink>>,
) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name("airprox-adsb".into())
        .spawn(move || {
            adsb_loop(
                &aircraft,
                &state,
                &config,
                &*clock,
                &tick_lock,
                telemetry.as_deref(),
            )
        })
        .expect("failed to spawn adsb worker")
}

fn physics_loop(
    aircraft: &[Arc<AircraftHandle>],
    state: &SimulationState,
    config: &RunConfig,
    clock: &dyn Clock,
    tick_lock: &RwLock<()>,
    telemetry: Option<&TelemetrySink>,
) {
    let dt = config.physics_dt();
    let tick_duration = Duration::from_secs_f64(dt);
    let mut next_tick = clock.now();

    while state.is_running() {
        if state.is_paused() {
            clock.sleep(PAUSE_POLL);
            next_tick = clock.now();
            continue;
        }
        if state.reset_demanded() {
            for handle in aircraft {
                handle.reset();
            }
            state.apply_reset();
        }

        // The whole tick runs under the write side of the tick barrier,
        // which is released before the pacing sleep.
        {
            let _tick = tick_lock.write().expect("tick lock poisoned");

            // Pursuit targets come from the pre-tick snapshot so both
            // aircraft see the same "before" state.
            let pursuits: Vec<Option<Vec3>> = (0..aircraft.len())
                .map(|index| forced_pursuit(aircraft, state, index))
                .collect();

            // Advance every aircraft in id order.
            for (handle, pursuit) in aircraft.iter().zip(pursuits) {
                let mut fcc = handle.fcc.lock().expect("fcc lock poisoned");
                let mut vehicle = handle.vehicle.write().expect("vehicle lock poisoned");
                physics::step_aircraft(&mut vehicle, &mut fcc, dt, pursuit);
            }
            state.count_physics_cycle();

            // Collision check over the post-step state.
            let guards: Vec<_> = aircraft
                .iter()
                .map(|handle| handle.vehicle.read().expect("vehicle lock poisoned"))
                .collect();
            let vehicles: Vec<&Vehicle> = guards.iter().map(|guard| &**guard).collect();
            if physics::contact_scan(&vehicles, state, dt, telemetry) {
                state.request_stop();
                break;
            }
        }

        // Pacing: sleep to the next aligned tick; if more than one tick
        // behind, reset the origin instead of spiralling into catch-up.
        next_tick += tick_duration;
        let now = clock.now();
        if next_tick > now {
            clock.sleep(next_tick - now);
        } else {
            let behind = now - next_tick;
            if behind > tick_duration {
                let skipped = (behind.as_secs_f64() / dt).ceil() as u64;
                state.count_skipped_ticks(skipped);
                warn!(
                    "{}",
                    SimError::ClockFault {
                        behind_ticks: skipped
                    }
                );
                next_tick = now;
            }
        }
    }
    debug!(
        cycles = state.physics_cycles(),
        "physics worker exiting"
    );
}

/// Pursuit point for the forced-collision study flags, if set for this
/// aircraft.
fn forced_pursuit(
    aircraft: &[Arc<AircraftHandle>],
    state: &SimulationState,
    index: usize,
) -> Option<Vec3> {
    if aircraft.len() < 2 {
        return None;
    }
    let forced = match index {
        0 => state.first_cause_collision(),
        1 => state.second_cause_collision(),
        _ => false,
    };
    if !forced {
        return None;
    }
    let opponent = aircraft[1 - index]
        .vehicle
        .read()
        .expect("vehicle lock poisoned");
    Some(physics::pursuit_target(&opponent))
}

fn adsb_loop(
    aircraft: &[Arc<AircraftHandle>],
    state: &SimulationState,
    config: &RunConfig,
    clock: &dyn Clock,
    tick_lock: &RwLock<()>,
    telemetry: Option<&TelemetrySink>,
) {
    let cycle_duration = Duration::from_secs_f64(config.adsb_dt());
    let mut next_cycle = clock.now();

    while state.is_running() {
        if state.is_paused() {
            clock.sleep(PAUSE_POLL);
            next_cycle = clock.now();
            continue;
        }

        // Snapshot the fleet between ticks: the barrier's read side is
        // held only across the copy.
        let observations: Vec<AdsbObservation> = {
            let _tick = tick_lock.read().expect("tick lock poisoned");
            aircraft
                .iter()
                .map(|handle| {
                    AdsbObservation::of(&handle.vehicle.read().expect("vehicle lock poisoned"))
                })
                .collect()
        };
        {
            let mut fccs: Vec<_> = aircraft
                .iter()
                .map(|handle| handle.fcc.lock().expect("fcc lock poisoned"))
                .collect();
            adsb::run_cycle(
                &observations,
                &mut fccs,
                state,
                config.conflict_horizon_secs,
                telemetry,
            );
        }

        next_cycle += cycle_duration;
        let now = clock.now();
        if next_cycle > now {
            clock.sleep(next_cycle - now);
        } else if now - next_cycle > cycle_duration {
            next_cycle = now;
        }
    }
    debug!(cycles = state.adsb_cycles(), "adsb worker exiting");
}
