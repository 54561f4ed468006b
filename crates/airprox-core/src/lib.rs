//! Core types and definitions for the airprox simulation.
//!
//! This crate defines the vocabulary shared across all other crates:
//! geometry, constants, scenario records, the shared simulation state,
//! telemetry events, and error types. It has no dependency on threads,
//! clocks, or any I/O.

pub mod constants;
pub mod error;
pub mod events;
pub mod records;
pub mod state;
pub mod types;
