//! Parallel execution of realisation jobs.
//!
//! Each job builds its own network and planner state from scratch, so jobs
//! run on a rayon pool without any shared mutable state. Output ordering in
//! the manifest follows the job list, not completion order.

use crate::job::{BatchJob, BatchJobRecord, PlanMode};
use crate::manifest::BatchManifest;
use anyhow::{ensure, Context, Result};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::fs;
use std::path::PathBuf;
use vlt_algo::{
    derate_planned_capacities, solve_deterministically, solve_in_real_time, CapacityHistory,
    DeratePolicy, GroupOrder,
};
use vlt_core::evaluate::objective_value;
use vlt_core::CostConfig;
use vlt_io::{importers, write_solution};

/// Settings for one batch run over a dataset's realisations.
pub struct BatchRunnerConfig {
    pub jobs: Vec<BatchJob>,
    pub output_root: PathBuf,
    pub mode: PlanMode,
    pub costs: CostConfig,
    pub order: GroupOrder,
    /// Applied to the planned capacities before planning, when set.
    pub derate: Option<DeratePolicy>,
    /// 0 means one thread per CPU.
    pub threads: usize,
}

/// Summary returned after the run, alongside the manifest on disk.
pub struct BatchSummary {
    pub success: usize,
    pub failure: usize,
    pub manifest_path: PathBuf,
    pub jobs: Vec<BatchJobRecord>,
}

/// Worker count for the realisation pool. Each job owns a full
/// time-expanded network, so running more workers than jobs only costs
/// memory; the pool is capped at the job count (and at the CPU count when
/// no explicit thread count is given).
fn worker_count(requested: usize, job_count: usize) -> usize {
    let ceiling = if requested == 0 {
        num_cpus::get()
    } else {
        requested
    };
    ceiling.min(job_count).max(1)
}

pub fn run_batch(config: &BatchRunnerConfig) -> Result<BatchSummary> {
    ensure!(!config.jobs.is_empty(), "batch contains no realisations");
    fs::create_dir_all(&config.output_root).with_context(|| {
        format!(
            "preparing batch output root '{}'",
            config.output_root.display()
        )
    })?;

    let pool = ThreadPoolBuilder::new()
        .num_threads(worker_count(config.threads, config.jobs.len()))
        .build()
        .context("building the realisation worker pool")?;
    let records: Vec<BatchJobRecord> = pool.install(|| {
        config
            .jobs
            .par_iter()
            .map(|job| run_job(job, config))
            .collect()
    });

    let manifest = BatchManifest::summarise(config.mode, records);
    let manifest_path = config.output_root.join("batch_manifest.json");
    manifest.write(&manifest_path)?;

    let BatchManifest {
        success,
        failure,
        jobs,
        ..
    } = manifest;
    Ok(BatchSummary {
        success,
        failure,
        manifest_path,
        jobs,
    })
}

/// Runs one realisation: ingest, optional derating, plan, evaluate, write
/// the artifact. Failures turn into an "error" record, never a panic that
/// would tear down sibling jobs.
fn run_job(job: &BatchJob, config: &BatchRunnerConfig) -> BatchJobRecord {
    let output_dir = config.output_root.join(&job.job_id);
    let output_file = output_dir.join("solution.json");

    let runner = || -> Result<f64> {
        fs::create_dir_all(&output_dir)
            .with_context(|| format!("creating job output dir '{}'", output_dir.display()))?;
        let mut dataset = importers::read_dataset(&job.dataset_dir, &job.realised_file)
            .with_context(|| format!("reading dataset for job {}", job.job_id))?;

        if let Some(policy) = config.derate {
            let history_path = job.dataset_dir.join("capacity_history.csv");
            let observations = importers::read_history(&history_path)
                .with_context(|| format!("reading history for job {}", job.job_id))?;
            let history = CapacityHistory::from_observations(&observations)?;
            derate_planned_capacities(&mut dataset.trucks_planned, &history, policy)?;
        }

        let (vehicle_assignments, truck_assignments) = match config.mode {
            PlanMode::Deterministic => solve_deterministically(
                &dataset.vehicles,
                &dataset.trucks_realised,
                &dataset.locations,
                config.costs,
                config.order,
            )?,
            PlanMode::RealTime => {
                let outcome = solve_in_real_time(
                    &dataset.vehicles,
                    &dataset.trucks_planned,
                    &dataset.trucks_realised,
                    &dataset.locations,
                    config.costs,
                    config.order,
                )?;
                (outcome.vehicle_assignments, outcome.truck_assignments)
            }
        };

        write_solution(&output_file, &vehicle_assignments, &truck_assignments)?;
        Ok(objective_value(
            &vehicle_assignments,
            &truck_assignments,
            &dataset.trucks_realised,
            &config.costs,
        ))
    };

    match runner() {
        Ok(objective) => BatchJobRecord {
            job_id: job.job_id.clone(),
            realised_file: job.realised_file.clone(),
            status: "ok".to_string(),
            error: None,
            output: output_file.display().to_string(),
            objective: Some(objective),
        },
        Err(err) => {
            eprintln!("batch job {} failed: {err:#}", job.job_id);
            BatchJobRecord {
                job_id: job.job_id.clone(),
                realised_file: job.realised_file.clone(),
                status: "error".to_string(),
                error: Some(err.to_string()),
                output: output_file.display().to_string(),
                objective: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_dataset(dir: &std::path::Path) {
        fs::write(
            dir.join("vehicle_data.csv"),
            "TRO;1;a;b;GER01PLANT;ITA01DEAL;01/01/2025-10:00:00;x;05/01/2025-00:00:00\n",
        )
        .unwrap();
        let truck_row =
            "PLT;x;y;GER01PLANTITA01DEAL-TRUCK-1;02/01/2025-08:00:00;04/01/2025-18:00:00;2.0;0.0\n";
        fs::write(dir.join("planned_capacity_data.csv"), truck_row).unwrap();
        fs::write(dir.join("realised_capacity_data_001.csv"), truck_row).unwrap();
        // A second realisation that is unparseable, to exercise failure
        // isolation.
        fs::write(
            dir.join("realised_capacity_data_002.csv"),
            "PLT;x;y;NOT-A-SEGMENT;bad;worse;1;1\n",
        )
        .unwrap();
    }

    #[test]
    fn test_batch_isolates_failures() {
        let dataset_dir = tempfile::tempdir().unwrap();
        write_dataset(dataset_dir.path());
        let output_root = tempfile::tempdir().unwrap();

        let jobs = crate::job::discover_jobs(dataset_dir.path()).unwrap();
        assert_eq!(jobs.len(), 2);
        let config = BatchRunnerConfig {
            jobs,
            output_root: output_root.path().to_path_buf(),
            mode: PlanMode::Deterministic,
            costs: CostConfig::default(),
            order: GroupOrder::Ascending,
            derate: None,
            threads: 2,
        };
        let summary = run_batch(&config).unwrap();
        assert_eq!(summary.success, 1);
        assert_eq!(summary.failure, 1);
        assert!(summary.manifest_path.exists());
        // The good job wrote its artifact; on-time delivery of the single
        // vehicle on a free truck costs nothing.
        let ok_record = summary.jobs.iter().find(|r| r.status == "ok").unwrap();
        assert_eq!(ok_record.objective, Some(0.0));
        assert!(std::path::Path::new(&ok_record.output).exists());
    }

    #[test]
    fn test_batch_realtime_mode() {
        let dataset_dir = tempfile::tempdir().unwrap();
        write_dataset(dataset_dir.path());
        fs::remove_file(dataset_dir.path().join("realised_capacity_data_002.csv")).unwrap();
        let output_root = tempfile::tempdir().unwrap();

        let jobs = crate::job::discover_jobs(dataset_dir.path()).unwrap();
        let config = BatchRunnerConfig {
            jobs,
            output_root: output_root.path().to_path_buf(),
            mode: PlanMode::RealTime,
            costs: CostConfig::default(),
            order: GroupOrder::Ascending,
            derate: None,
            threads: 1,
        };
        let summary = run_batch(&config).unwrap();
        assert_eq!(summary.success, 1);
        assert_eq!(summary.jobs[0].objective, Some(0.0));
    }
}
