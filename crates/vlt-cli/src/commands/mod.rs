pub mod evaluate;
pub mod plan;
pub mod verify;

use std::collections::BTreeMap;
use vlt_core::{Truck, TruckId};
use vlt_io::Dataset;

/// All trucks a run could have touched, with realised capacities taking
/// precedence over planned announcements for shared identifiers.
pub fn merged_trucks(dataset: &Dataset) -> BTreeMap<TruckId, Truck> {
    let mut trucks = dataset.trucks_planned.clone();
    for (truck_id, truck) in &dataset.trucks_realised {
        trucks.insert(truck_id.clone(), truck.clone());
    }
    trucks
}
