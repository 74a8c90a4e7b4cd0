//! # vlt-io: Dataset Ingestion and Artifact Persistence
//!
//! Two boundaries of the planner:
//!
//! - [`importers`] reads the `;`-separated dataset CSVs (vehicles, planned
//!   and realised truck capacities, capacity history) into the `vlt-core`
//!   model, refusing malformed rows with line-numbered errors.
//! - [`export`] writes and reads the JSON solution artifact produced per
//!   run (vehicle assignments plus the full truck-assignment key set).

pub mod export;
pub mod importers;

pub use export::{read_solution, write_solution, SolutionArtifact, TruckAssignmentRecord};
pub use importers::{
    parse_location, parse_segment, read_dataset, read_history, read_trucks, read_vehicles,
    Dataset,
};
