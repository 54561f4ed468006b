//! Simulation constants and tuning parameters.

/// Standard gravitational acceleration (m/s²), used by the
/// coordinated-turn relation.
pub const G_ACCELERATION: f64 = 9.81;

// --- Loop rates ---

/// Default physics integration rate (Hz).
pub const DEFAULT_PHYSICS_HZ: f64 = 100.0;

/// Default ADS-B observer rate (Hz).
pub const DEFAULT_ADSB_HZ: f64 = 1.0;

// --- Angular inertia ---

/// Time for the roll angle to traverse its full 90° authority (ms).
/// 1000 ms gives a 90°/s maximum roll rate.
pub const ROLL_DYNAMIC_DELAY_MS: f64 = 1000.0;

/// Time for the pitch angle to traverse its full 45° authority (ms).
/// 2000 ms gives a 22.5°/s maximum pitch rate.
pub const PITCH_DYNAMIC_DELAY_MS: f64 = 2000.0;

// --- Flight envelope ---

/// Maximum commanded roll angle magnitude (degrees).
pub const MAX_ROLL_ANGLE: f64 = 90.0;

/// Maximum commanded pitch angle magnitude (degrees).
pub const MAX_PITCH_ANGLE: f64 = 45.0;

/// Maximum longitudinal acceleration (m/s²).
pub const MAX_ACCELERATION: f64 = 2.0;

// --- Airframe ---

/// Default vehicle bounding-sphere radius (m).
pub const DEFAULT_VEHICLE_SIZE: f64 = 5.0;

// --- Separation ---

/// Default safe-zone radius around each aircraft (m). A projected miss
/// distance below this declares a conflict.
pub const DEFAULT_MINIMUM_SEPARATION: f64 = 50.0;

/// Default look-ahead horizon for conflict detection (s). Closest
/// approaches further out than this are ignored.
pub const DEFAULT_CONFLICT_HORIZON_SECS: f64 = 30.0;

// --- World ---

/// Destination components beyond this bound are snapped back to it (m).
pub const WORLD_BOUND: f64 = 1_500_000.0;
