//! Process-wide shared simulation state.
//!
//! One `SimulationState` is shared by the physics loop, the ADS-B loop,
//! and the driver. Scalar flags and counters are per-field atomics so no
//! reader ever blocks a tick; the pause clock and the running minimum
//! separation sit behind a mutex because they are compound updates.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Pause bookkeeping, guarded together so a resume cannot observe a
/// cleared start timestamp with stale accumulated time.
#[derive(Debug, Default)]
struct PauseClock {
    pause_started: Option<Instant>,
    total_paused: Duration,
}

/// Shared state record. All cross-thread communication between the two
/// simulation loops and the driver goes through here.
#[derive(Debug)]
pub struct SimulationState {
    is_realtime: bool,
    minimum_separation: f64,
    avoid_collisions: AtomicBool,
    override_avoid_collisions: AtomicBool,
    physics_cycles: AtomicU64,
    adsb_cycles: AtomicU64,
    /// Ticks dropped by clock-fault recovery.
    skipped_ticks: AtomicU64,
    is_paused: AtomicBool,
    is_running: AtomicBool,
    reset_demanded: AtomicBool,
    collision: AtomicBool,
    first_cause_collision: AtomicBool,
    second_cause_collision: AtomicBool,
    pause_clock: Mutex<PauseClock>,
    minimal_relative_distance: Mutex<f64>,
}

impl SimulationState {
    pub fn new(is_realtime: bool, avoid_collisions: bool, minimum_separation: f64) -> Self {
        Self {
            is_realtime,
            minimum_separation,
            avoid_collisions: AtomicBool::new(avoid_collisions),
            override_avoid_collisions: AtomicBool::new(false),
            physics_cycles: AtomicU64::new(0),
            adsb_cycles: AtomicU64::new(0),
            skipped_ticks: AtomicU64::new(0),
            is_paused: AtomicBool::new(false),
            is_running: AtomicBool::new(true),
            reset_demanded: AtomicBool::new(false),
            collision: AtomicBool::new(false),
            first_cause_collision: AtomicBool::new(false),
            second_cause_collision: AtomicBool::new(false),
            pause_clock: Mutex::new(PauseClock::default()),
            minimal_relative_distance: Mutex::new(f64::INFINITY),
        }
    }

    pub fn is_realtime(&self) -> bool {
        self.is_realtime
    }

    pub fn minimum_separation(&self) -> f64 {
        self.minimum_separation
    }

    pub fn avoid_collisions(&self) -> bool {
        self.avoid_collisions.load(Ordering::SeqCst)
            && !self.override_avoid_collisions.load(Ordering::SeqCst)
    }

    pub fn set_avoid_collisions(&self, enabled: bool) {
        self.avoid_collisions.store(enabled, Ordering::SeqCst);
    }

    /// Suppresses avoidance without losing the configured setting.
    pub fn set_override_avoid_collisions(&self, suppressed: bool) {
        self.override_avoid_collisions
            .store(suppressed, Ordering::SeqCst);
    }

    // --- Cycle counters ---

    pub fn physics_cycles(&self) -> u64 {
        self.physics_cycles.load(Ordering::Relaxed)
    }

    pub fn count_physics_cycle(&self) -> u64 {
        self.physics_cycles.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn adsb_cycles(&self) -> u64 {
        self.adsb_cycles.load(Ordering::Relaxed)
    }

    pub fn count_adsb_cycle(&self) -> u64 {
        self.adsb_cycles.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn skipped_ticks(&self) -> u64 {
        self.skipped_ticks.load(Ordering::Relaxed)
    }

    pub fn count_skipped_ticks(&self, ticks: u64) {
        self.skipped_ticks.fetch_add(ticks, Ordering::Relaxed);
    }

    // --- Run control ---

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// Signals both loops to finish their current tick and exit.
    pub fn request_stop(&self) {
        self.is_running.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused.load(Ordering::SeqCst)
    }

    /// Flips the pause flag, crediting paused wall time on resume.
    pub fn toggle_pause(&self, now: Instant) {
        if self.is_paused.load(Ordering::SeqCst) {
            self.append_paused_time(now);
            self.is_paused.store(false, Ordering::SeqCst);
        } else if self.is_running() {
            let mut clock = self.pause_clock.lock().expect("pause clock poisoned");
            clock.pause_started = Some(now);
            drop(clock);
            self.is_paused.store(true, Ordering::SeqCst);
        }
    }

    /// Folds an open pause interval into the paused-time total.
    pub fn append_paused_time(&self, now: Instant) {
        let mut clock = self.pause_clock.lock().expect("pause clock poisoned");
        if let Some(started) = clock.pause_started.take() {
            clock.total_paused += now.duration_since(started);
        }
    }

    /// Total wall time spent paused so far.
    pub fn time_paused(&self) -> Duration {
        self.pause_clock
            .lock()
            .expect("pause clock poisoned")
            .total_paused
    }

    pub fn reset_demanded(&self) -> bool {
        self.reset_demanded.load(Ordering::SeqCst)
    }

    /// Asks the physics loop to restore all aircraft at its next tick.
    pub fn demand_reset(&self) {
        self.reset_demanded.store(true, Ordering::SeqCst);
    }

    /// Acknowledges a completed reset and clears the outcome fields.
    pub fn apply_reset(&self) {
        self.reset_demanded.store(false, Ordering::SeqCst);
        self.collision.store(false, Ordering::SeqCst);
        *self
            .minimal_relative_distance
            .lock()
            .expect("minimal distance poisoned") = f64::INFINITY;
    }

    // --- Outcomes ---

    pub fn collision(&self) -> bool {
        self.collision.load(Ordering::SeqCst)
    }

    pub fn register_collision(&self) {
        self.collision.store(true, Ordering::SeqCst);
    }

    pub fn first_cause_collision(&self) -> bool {
        self.first_cause_collision.load(Ordering::SeqCst)
    }

    pub fn second_cause_collision(&self) -> bool {
        self.second_cause_collision.load(Ordering::SeqCst)
    }

    /// Forces one aircraft onto a deliberate collision course (study
    /// scenarios only).
    pub fn set_cause_collision(&self, aircraft_id: u32, enabled: bool) {
        match aircraft_id {
            0 => self.first_cause_collision.store(enabled, Ordering::SeqCst),
            1 => self.second_cause_collision.store(enabled, Ordering::SeqCst),
            _ => {}
        }
    }

    /// Records an observed projected miss distance, keeping the minimum.
    pub fn record_relative_distance(&self, distance: f64) {
        let mut min = self
            .minimal_relative_distance
            .lock()
            .expect("minimal distance poisoned");
        if distance < *min {
            *min = distance;
        }
    }

    pub fn minimal_relative_distance(&self) -> f64 {
        *self
            .minimal_relative_distance
            .lock()
            .expect("minimal distance poisoned")
    }
}
