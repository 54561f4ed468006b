//! Batch execution: every scenario runs twice (avoidance off, then on)
//! and lands in one combined result row.

use std::error::Error;
use std::path::Path;
use std::sync::atomic::Ordering;

use tracing::{error, info};

use airprox_core::error::SimError;
use airprox_core::records::ScenarioRecord;
use airprox_sim::runner::ScenarioRunner;

use crate::data::{self, RowOutcomes, ScenarioRow};

/// Aggregate counts of one batch pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Scenarios run to completion and recorded.
    pub passed: usize,
    /// Scenarios skipped over invalid input.
    pub failed: usize,
    /// Whether the pass was cut short by a stop request.
    pub cancelled: bool,
}

/// Runs a batch and writes the result file. Invalid scenarios get a
/// one-line diagnostic and the batch keeps going; a stop request ends
/// the pass after the current scenario.
pub fn run_batch(
    records: &[Result<ScenarioRecord, SimError>],
    runner: &ScenarioRunner,
    output_path: &Path,
) -> Result<BatchOutcome, Box<dyn Error>> {
    let stop = runner.stop_handle();
    let mut rows: Vec<ScenarioRow> = Vec::new();
    let mut failed = 0;
    let mut cancelled = false;

    for entry in records {
        if stop.load(Ordering::SeqCst) {
            info!("batch pass ended: {}", SimError::Cancelled);
            cancelled = true;
            break;
        }
        match entry {
            Ok(record) => {
                info!(test_id = record.test_id, "running scenario pair");
                let without_avoidance = runner.run_headless(record, false);
                let with_avoidance = runner.run_headless(record, true);
                rows.push(ScenarioRow {
                    record: *record,
                    outcomes: RowOutcomes::from_results(&without_avoidance, &with_avoidance),
                });
            }
            Err(err) => {
                error!("skipping scenario: {err}");
                failed += 1;
            }
        }
    }

    data::write_rows(output_path, &rows)?;
    info!(
        passed = rows.len(),
        failed,
        output = %output_path.display(),
        "batch pass recorded"
    );
    Ok(BatchOutcome {
        passed: rows.len(),
        failed,
        cancelled,
    })
}
