//! Error types shared across the workspace.

use thiserror::Error;

/// Failures surfaced by the engine and the scenario driver.
///
/// Collisions are outcomes, not errors — a run that ends in a collision
/// still produces a valid result record.
#[derive(Debug, Error)]
pub enum SimError {
    /// A scenario row could not be turned into a runnable record
    /// (wrong column count, unparsable or non-finite numeric field).
    /// Aborts the affected scenario only.
    #[error("invalid scenario (row {row}): {reason}")]
    InvalidScenario { row: usize, reason: String },

    /// A destination was rejected by validation: coincident with the
    /// aircraft's current position. Recovered locally.
    #[error("invalid destination for aircraft {aircraft_id}: {reason}")]
    InvalidDestination { aircraft_id: u32, reason: String },

    /// The monotonic clock skewed beyond one tick period. The loop resets
    /// its tick origin and keeps going; the count is reported for
    /// reproducibility audits.
    #[error("clock fault: tick origin reset after falling {behind_ticks} ticks behind")]
    ClockFault { behind_ticks: u64 },

    /// A stop was requested. Graceful shutdown, not a failure.
    #[error("run cancelled")]
    Cancelled,
}
