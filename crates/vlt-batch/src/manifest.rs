//! Batch manifest: the machine-readable tally written next to the per-job
//! artifacts so downstream reporting can find everything without globbing.

use crate::job::{BatchJobRecord, PlanMode};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchManifest {
    pub created_at: DateTime<Utc>,
    pub mode: String,
    pub num_jobs: usize,
    pub success: usize,
    pub failure: usize,
    pub jobs: Vec<BatchJobRecord>,
}

impl BatchManifest {
    /// Tallies per-job outcomes into the manifest. Job order is preserved
    /// as given (the runner keeps realisation-index order).
    pub fn summarise(mode: PlanMode, jobs: Vec<BatchJobRecord>) -> Self {
        let success = jobs.iter().filter(|record| record.is_ok()).count();
        BatchManifest {
            created_at: Utc::now(),
            mode: mode.as_str().to_string(),
            num_jobs: jobs.len(),
            success,
            failure: jobs.len() - success,
            jobs,
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("creating batch manifest '{}'", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .with_context(|| format!("writing batch manifest '{}'", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(job_id: &str, status: &str) -> BatchJobRecord {
        BatchJobRecord {
            job_id: job_id.into(),
            realised_file: format!("realised_capacity_data_{job_id}.csv"),
            status: status.into(),
            error: (status == "error").then(|| "boom".into()),
            output: format!("out/{job_id}/solution.json"),
            objective: (status == "ok").then_some(1234.5),
        }
    }

    #[test]
    fn test_summarise_counts_outcomes() {
        let manifest = BatchManifest::summarise(
            PlanMode::RealTime,
            vec![record("001", "ok"), record("002", "error"), record("003", "ok")],
        );
        assert_eq!(manifest.mode, "real_time");
        assert_eq!(manifest.num_jobs, 3);
        assert_eq!(manifest.success, 2);
        assert_eq!(manifest.failure, 1);
        // Realisation order preserved.
        assert_eq!(manifest.jobs[1].job_id, "002");
    }

    #[test]
    fn test_write_and_read_back() {
        let manifest =
            BatchManifest::summarise(PlanMode::Deterministic, vec![record("001", "ok")]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch_manifest.json");
        manifest.write(&path).unwrap();
        let read: BatchManifest =
            serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        assert_eq!(read.mode, "deterministic");
        assert_eq!(read.jobs[0].objective, Some(1234.5));
    }
}
