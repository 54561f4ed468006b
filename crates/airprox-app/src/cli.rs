//! Command-line surface of the study driver.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// airprox: a two-aircraft collision-avoidance study simulator.
///
/// Without a subcommand, runs the built-in demonstration scenario in
/// realtime with avoidance enabled.
#[derive(Parser, Debug)]
#[command(name = "airprox", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one scenario in realtime, reporting ADS-B telemetry on the
    /// console.
    Realtime {
        /// Scenario CSV file (defaults to the built-in scenario).
        file: Option<PathBuf>,
        /// Row index within the file.
        #[arg(default_value_t = 0)]
        index: usize,
        /// Enable the avoidance logic.
        #[arg(long)]
        avoid: bool,
    },
    /// Run the built-in scenario headless and print both outcomes
    /// (avoidance off, then on).
    Headless,
    /// Generate N encounter scenarios and run the recorded batch.
    Tests {
        /// Number of scenarios (clamped to 10..=100).
        #[arg(default_value_t = 10)]
        count: usize,
        /// RNG seed for reproducible batches.
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Re-run the active scenario file in a loop, writing a timestamped
    /// result file per pass.
    Ongoing,
    /// Load a recorded scenario and replay it against its stored
    /// outcome columns.
    Load {
        file: PathBuf,
        /// Row index within the file.
        #[arg(default_value_t = 0)]
        index: usize,
    },
}
