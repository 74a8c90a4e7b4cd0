//! # vlt-batch: Realisation Fan-Out
//!
//! Runs the planner over every realised-capacity draw of a dataset in
//! parallel. Realisations are independent, so each job owns its network and
//! planner state outright; rayon distributes the jobs and a JSON manifest
//! records per-job status, artifact location and objective in stable job
//! order.

pub mod job;
pub mod manifest;
pub mod runner;

pub use job::{discover_jobs, BatchJob, BatchJobRecord, PlanMode};
pub use manifest::BatchManifest;
pub use runner::{run_batch, BatchRunnerConfig, BatchSummary};
