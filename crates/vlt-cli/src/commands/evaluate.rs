//! The `evaluate` command: objective and metrics of an artifact, with
//! optional horizon trimming for fair cross-run comparison.

use super::merged_trucks;
use crate::cli::EvaluateArgs;
use anyhow::Result;
use vlt_core::evaluate::{objective_value, remove_horizon, SolutionMetrics};
use vlt_core::CostConfig;
use vlt_io::{importers, read_solution};

pub fn run(args: &EvaluateArgs) -> Result<()> {
    let (vehicle_assignments, truck_assignments) = read_solution(&args.artifact)?;
    let dataset = importers::read_dataset(&args.dataset, &args.realised_file)?;
    let trucks = merged_trucks(&dataset);

    let (vehicle_assignments, truck_assignments) = if args.front_horizon != 0 || args.back_horizon != 0 {
        remove_horizon(
            &vehicle_assignments,
            &dataset.vehicles,
            &truck_assignments,
            &trucks,
            args.front_horizon,
            args.back_horizon,
        )
    } else {
        (vehicle_assignments, truck_assignments)
    };

    let costs = CostConfig::default();
    let objective = objective_value(&vehicle_assignments, &truck_assignments, &trucks, &costs);
    let metrics = SolutionMetrics::compute(&vehicle_assignments, &truck_assignments, &trucks);
    println!("objective: {objective:.2}");
    println!("{metrics}");
    Ok(())
}
