//! Batch job definitions.
//!
//! One job is one realisation: the same dataset planned against one
//! realised-capacity file. Realisation files are independent draws, so jobs
//! share no mutable state and parallelise trivially.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Planning mode a batch runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanMode {
    /// Plan once against the realised capacities (full hindsight).
    Deterministic,
    /// Roll day by day, discovering realised capacities as they happen.
    RealTime,
}

impl PlanMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PlanMode::Deterministic => "deterministic",
            PlanMode::RealTime => "real_time",
        }
    }
}

/// One realisation to plan.
#[derive(Debug, Clone)]
pub struct BatchJob {
    /// Stable id, also the output subdirectory name.
    pub job_id: String,
    pub dataset_dir: PathBuf,
    /// File name of the realised-capacity CSV within `dataset_dir`.
    pub realised_file: String,
}

/// Outcome record of one job, as written into the batch manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchJobRecord {
    pub job_id: String,
    pub realised_file: String,
    /// "ok" or "error".
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objective: Option<f64>,
}

impl BatchJobRecord {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Finds the realisation files of a dataset directory
/// (`realised_capacity_data*.csv`), sorted by name so job ids and report
/// ordering are stable across runs.
pub fn discover_jobs(dataset_dir: &Path) -> Result<Vec<BatchJob>> {
    let mut files: Vec<String> = std::fs::read_dir(dataset_dir)
        .with_context(|| format!("reading dataset dir '{}'", dataset_dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with("realised_capacity_data") && name.ends_with(".csv"))
        .collect();
    files.sort();
    Ok(files
        .into_iter()
        .map(|realised_file| BatchJob {
            job_id: realised_file
                .trim_end_matches(".csv")
                .trim_start_matches("realised_capacity_data")
                .trim_start_matches('_')
                .to_string(),
            dataset_dir: dataset_dir.to_path_buf(),
            realised_file,
        })
        .map(|mut job| {
            if job.job_id.is_empty() {
                job.job_id = "000".to_string();
            }
            job
        })
        .collect())
}
