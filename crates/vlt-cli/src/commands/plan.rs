//! The `plan` command: run the planner over a dataset's realisations.

use crate::cli::{PlanArgs, SolverKind};
use anyhow::{bail, Result};
use tracing::info;
use vlt_algo::DeratePolicy;
use vlt_batch::{discover_jobs, run_batch, BatchRunnerConfig, PlanMode};
use vlt_core::CostConfig;

pub fn run(args: &PlanArgs) -> Result<()> {
    let mut jobs = discover_jobs(&args.dataset)?;
    if jobs.is_empty() {
        bail!(
            "no realised_capacity_data*.csv files in '{}'",
            args.dataset.display()
        );
    }
    if !args.dataset_indices.is_empty() {
        jobs.retain(|job| {
            job.job_id
                .parse::<usize>()
                .map(|index| args.dataset_indices.contains(&index))
                .unwrap_or(false)
        });
        if jobs.is_empty() {
            bail!("no realisations match the requested indices");
        }
    }

    let derate = match (args.quantile, args.stddev_factor) {
        (0.0, 0.0) => None,
        (q, 0.0) => Some(DeratePolicy::QuantileReplacement { quantile: q }),
        (0.0, k) => Some(DeratePolicy::StddevSubtraction { factor: k }),
        _ => bail!("choose either --quantile or --stddev-factor, not both"),
    };

    match args.solver {
        SolverKind::Flow => {
            let mode = if args.deterministic {
                PlanMode::Deterministic
            } else {
                PlanMode::RealTime
            };
            let config = BatchRunnerConfig {
                jobs,
                output_root: args.out.clone(),
                mode,
                costs: CostConfig::default(),
                order: args.group_order.into(),
                derate,
                threads: args.threads,
            };
            let summary = run_batch(&config)?;
            for record in &summary.jobs {
                match record.objective {
                    Some(objective) => {
                        info!(job = %record.job_id, objective, "realisation planned")
                    }
                    None => info!(job = %record.job_id, "realisation failed"),
                }
            }
            info!(
                success = summary.success,
                failure = summary.failure,
                manifest = %summary.manifest_path.display(),
                "batch finished"
            );
            if summary.failure > 0 {
                bail!("{} of {} realisations failed", summary.failure, summary.jobs.len());
            }
            Ok(())
        }
        SolverKind::Mip => run_mip(args, jobs, derate),
    }
}

#[cfg(feature = "mip")]
fn run_mip(
    args: &PlanArgs,
    jobs: Vec<vlt_batch::BatchJob>,
    derate: Option<DeratePolicy>,
) -> Result<()> {
    use vlt_algo::{derate_planned_capacities, solve_as_mip, CapacityHistory};
    use vlt_core::evaluate::objective_value;
    use vlt_io::importers;

    if !args.deterministic {
        bail!("the MIP solver is a deterministic validation mode; pass --deterministic");
    }
    std::fs::create_dir_all(&args.out)?;
    for job in jobs {
        let mut dataset = importers::read_dataset(&job.dataset_dir, &job.realised_file)?;
        if let Some(policy) = derate {
            let observations =
                importers::read_history(&job.dataset_dir.join("capacity_history.csv"))?;
            let history = CapacityHistory::from_observations(&observations)?;
            derate_planned_capacities(&mut dataset.trucks_planned, &history, policy)?;
        }
        let (vehicle_assignments, truck_assignments) = solve_as_mip(
            &dataset.vehicles,
            &dataset.trucks_realised,
            &dataset.locations,
            CostConfig::default(),
            args.group_order.into(),
        )?;
        let output_dir = args.out.join(&job.job_id);
        std::fs::create_dir_all(&output_dir)?;
        let output = output_dir.join("solution.json");
        vlt_io::write_solution(&output, &vehicle_assignments, &truck_assignments)?;
        let objective = objective_value(
            &vehicle_assignments,
            &truck_assignments,
            &dataset.trucks_realised,
            &CostConfig::default(),
        );
        info!(job = %job.job_id, objective, output = %output.display(), "mip realisation planned");
    }
    Ok(())
}

#[cfg(not(feature = "mip"))]
fn run_mip(
    _args: &PlanArgs,
    _jobs: Vec<vlt_batch::BatchJob>,
    _derate: Option<DeratePolicy>,
) -> Result<()> {
    bail!("this build has no MIP solver; rebuild with the 'mip' feature")
}
