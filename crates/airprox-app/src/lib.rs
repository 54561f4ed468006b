//! Console driver for the airprox study: CLI parsing, scenario CSV I/O,
//! the batch test runner, and the seeded scenario generator.

pub mod batch;
pub mod cli;
pub mod data;
pub mod generator;
