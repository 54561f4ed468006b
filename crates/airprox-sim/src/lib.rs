//! Simulation engine for the airprox study system.
//!
//! Composes aircraft (vehicle + flight-control computer), the fixed-step
//! physics system, the low-rate ADS-B conflict-detection system, and the
//! drivers that run them: a cooperative headless runner for batch studies
//! and a threaded realtime session.

pub mod aircraft;
pub mod clock;
pub mod fcc;
pub mod runner;
pub mod systems;
pub mod vehicle;
pub mod workers;

pub use aircraft::{Aircraft, AircraftHandle};
pub use airprox_core as core;
pub use runner::ScenarioRunner;

#[cfg(test)]
mod tests;
