//! Simulation systems, run in a fixed order each tick by whichever
//! driver owns the loop (headless runner or worker threads).

pub mod adsb;
pub mod physics;
