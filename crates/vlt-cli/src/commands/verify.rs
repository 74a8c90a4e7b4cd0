//! The `verify` command: check an artifact against the solution invariants.

use super::merged_trucks;
use crate::cli::VerifyArgs;
use anyhow::{bail, Result};
use tracing::{error, warn};
use vlt_core::verify::verify_solution;
use vlt_core::Severity;
use vlt_io::{importers, read_solution};

pub fn run(args: &VerifyArgs) -> Result<()> {
    let (vehicle_assignments, truck_assignments) = read_solution(&args.artifact)?;
    let dataset = importers::read_dataset(&args.dataset, &args.realised_file)?;
    let trucks = merged_trucks(&dataset);

    let report = verify_solution(
        &dataset.vehicles,
        &vehicle_assignments,
        &trucks,
        &truck_assignments,
    );
    for issue in &report.diagnostics.issues {
        match issue.severity {
            Severity::Warning => warn!("{issue}"),
            Severity::Error => error!("{issue}"),
        }
    }
    println!(
        "{} vehicles checked, {} errors, {} warnings, {} did not arrive",
        vehicle_assignments.len(),
        report.diagnostics.error_count(),
        report.diagnostics.warning_count(),
        report.non_arrived
    );
    if !report.is_valid() {
        bail!("solution violates invariants");
    }
    Ok(())
}
