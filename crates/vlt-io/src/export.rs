//! Solution artifact persistence.
//!
//! One JSON file per run holds both output structures: the vehicle
//! assignments sorted by id, and one entry per known truck, used and
//! unused alike, so consumers can tell "unused" from "unknown". Truck
//! identifiers are structured values, which JSON objects cannot key, so the
//! truck side serializes as a list of records. Days render as ISO-8601
//! strings and enums by variant name; a serialize/deserialize round trip
//! reproduces the input exactly.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use vlt_core::{TruckAssignment, TruckId, VehicleAssignment, VltResult};

/// On-disk form of a solution pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionArtifact {
    pub vehicle_assignments: Vec<VehicleAssignment>,
    pub truck_assignments: Vec<TruckAssignmentRecord>,
}

/// One truck's entry in the artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruckAssignmentRecord {
    pub truck: TruckId,
    pub load: Vec<usize>,
}

impl SolutionArtifact {
    pub fn new(
        vehicle_assignments: &[VehicleAssignment],
        truck_assignments: &BTreeMap<TruckId, TruckAssignment>,
    ) -> Self {
        let mut vehicle_assignments = vehicle_assignments.to_vec();
        vehicle_assignments.sort_by_key(|assignment| assignment.id);
        SolutionArtifact {
            vehicle_assignments,
            truck_assignments: truck_assignments
                .iter()
                .map(|(truck_id, assignment)| TruckAssignmentRecord {
                    truck: truck_id.clone(),
                    load: assignment.load.clone(),
                })
                .collect(),
        }
    }

    /// The in-memory pair this artifact encodes.
    pub fn into_parts(self) -> (Vec<VehicleAssignment>, BTreeMap<TruckId, TruckAssignment>) {
        let truck_assignments = self
            .truck_assignments
            .into_iter()
            .map(|record| (record.truck, TruckAssignment { load: record.load }))
            .collect();
        (self.vehicle_assignments, truck_assignments)
    }
}

/// Writes the artifact as pretty-printed JSON.
pub fn write_solution(
    path: &Path,
    vehicle_assignments: &[VehicleAssignment],
    truck_assignments: &BTreeMap<TruckId, TruckAssignment>,
) -> VltResult<()> {
    let artifact = SolutionArtifact::new(vehicle_assignments, truck_assignments);
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), &artifact)?;
    Ok(())
}

/// Reads an artifact back into the in-memory pair.
pub fn read_solution(
    path: &Path,
) -> VltResult<(Vec<VehicleAssignment>, BTreeMap<TruckId, TruckAssignment>)> {
    let file = File::open(path)?;
    let artifact: SolutionArtifact = serde_json::from_reader(BufReader::new(file))?;
    Ok(artifact.into_parts())
}
