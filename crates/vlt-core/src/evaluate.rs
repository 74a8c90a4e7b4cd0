//! Objective function, solution metrics and horizon trimming.
//!
//! The objective is the quantity every solver minimises:
//!
//! ```text
//! sum over used trucks of price * load / capacity
//!   + per delayed vehicle: fixed + days * per-day  (planned or unplanned rates)
//! ```
//!
//! Truck prices are prorated by occupancy, so a half-full truck costs half
//! its booking price. Delay rates depend on whether the delay was announced
//! in time (see [`CostConfig`]).

use crate::{
    CostConfig, Day, Truck, TruckAssignment, TruckId, Vehicle, VehicleAssignment,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Total cost of a solution under the given cost configuration.
pub fn objective_value(
    vehicle_assignments: &[VehicleAssignment],
    truck_assignments: &BTreeMap<TruckId, TruckAssignment>,
    trucks: &BTreeMap<TruckId, Truck>,
    costs: &CostConfig,
) -> f64 {
    let mut objective = 0.0;
    for (truck_id, assignment) in truck_assignments {
        if assignment.load.is_empty() {
            continue;
        }
        if let Some(truck) = trucks.get(truck_id) {
            if truck.capacity > 0 {
                objective +=
                    truck.price as f64 * assignment.load.len() as f64 / truck.capacity as f64;
            }
        }
    }
    for assignment in vehicle_assignments {
        let days = assignment.delayed_by as f64;
        if assignment.planned_delayed {
            objective +=
                costs.fixed_planned_delay as f64 + days * costs.per_planned_delay_day as f64;
        } else if assignment.delayed_by > 0 {
            objective +=
                costs.fixed_unplanned_delay as f64 + days * costs.per_unplanned_delay_day as f64;
        }
    }
    objective
}

/// Aggregate counters over a solution, for run reports.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SolutionMetrics {
    pub vehicles: usize,
    pub delayed: usize,
    pub planned_delayed: usize,
    pub planned_delayed_and_late: usize,
    pub total_delay_days: u64,
    /// Vehicles carried on trucks with a nonzero booking price.
    pub vehicles_on_priced_trucks: usize,
    /// Trucks that carry at least one vehicle.
    pub trucks_used: usize,
}

impl SolutionMetrics {
    pub fn compute(
        vehicle_assignments: &[VehicleAssignment],
        truck_assignments: &BTreeMap<TruckId, TruckAssignment>,
        trucks: &BTreeMap<TruckId, Truck>,
    ) -> Self {
        let mut metrics = SolutionMetrics {
            vehicles: vehicle_assignments.len(),
            ..Default::default()
        };
        for assignment in vehicle_assignments {
            if assignment.delayed_by > 0 {
                metrics.delayed += 1;
                metrics.total_delay_days += assignment.delayed_by as u64;
            }
            if assignment.planned_delayed {
                metrics.planned_delayed += 1;
                if assignment.delayed_by > 0 {
                    metrics.planned_delayed_and_late += 1;
                }
            }
        }
        for (truck_id, assignment) in truck_assignments {
            if assignment.load.is_empty() {
                continue;
            }
            metrics.trucks_used += 1;
            if trucks.get(truck_id).is_some_and(|t| t.price > 0) {
                metrics.vehicles_on_priced_trucks += assignment.load.len();
            }
        }
        metrics
    }
}

impl std::fmt::Display for SolutionMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} vehicles ({} delayed, {} planned-delayed, {} delay days), {} trucks used",
            self.vehicles,
            self.delayed,
            self.planned_delayed,
            self.total_delay_days,
            self.trucks_used
        )
    }
}

fn availability_window(vehicles: &[Vehicle], front: i32, back: i32) -> Option<(Day, Day)> {
    let first = vehicles.iter().map(|v| v.available).min()?;
    let last = vehicles.iter().map(|v| v.available).max()?;
    Some((first + front, last - back))
}

/// Drops assignments near the horizon edges for fair cross-run comparison.
///
/// Keeps vehicles whose availability falls inside
/// `[first_available + front, last_available - back]` and trucks whose
/// departure does, where first/last availability range over `vehicles`.
/// This is a pure filter: with `front = back = 0` it is the identity.
/// The filtered pair will generally no longer verify (loads may reference
/// dropped vehicles), so trim only after verification, before evaluation.
pub fn remove_horizon(
    vehicle_assignments: &[VehicleAssignment],
    vehicles: &[Vehicle],
    truck_assignments: &BTreeMap<TruckId, TruckAssignment>,
    trucks: &BTreeMap<TruckId, Truck>,
    front: i32,
    back: i32,
) -> (Vec<VehicleAssignment>, BTreeMap<TruckId, TruckAssignment>) {
    let Some((window_start, window_end)) = availability_window(vehicles, front, back) else {
        return (Vec::new(), BTreeMap::new());
    };
    let kept_vehicles: Vec<VehicleAssignment> = vehicle_assignments
        .iter()
        .filter(|va| {
            vehicles.get(va.id).is_some_and(|v| {
                v.available >= window_start && v.available <= window_end
            })
        })
        .cloned()
        .collect();
    let kept_trucks: BTreeMap<TruckId, TruckAssignment> = truck_assignments
        .iter()
        .filter(|(truck_id, _)| {
            trucks.get(truck_id).is_some_and(|t| {
                t.departure >= window_start && t.departure <= window_end
            })
        })
        .map(|(truck_id, assignment)| (truck_id.clone(), assignment.clone()))
        .collect();
    (kept_vehicles, kept_trucks)
}

/// Like [`remove_horizon`], but keeps every truck entry and instead strips
/// dropped vehicles out of the truck loads.
pub fn remove_horizon_keep_used_trucks(
    vehicle_assignments: &[VehicleAssignment],
    vehicles: &[Vehicle],
    truck_assignments: &BTreeMap<TruckId, TruckAssignment>,
    front: i32,
    back: i32,
) -> (Vec<VehicleAssignment>, BTreeMap<TruckId, TruckAssignment>) {
    let Some((window_start, window_end)) = availability_window(vehicles, front, back) else {
        return (Vec::new(), BTreeMap::new());
    };
    let kept_vehicles: Vec<VehicleAssignment> = vehicle_assignments
        .iter()
        .filter(|va| {
            vehicles.get(va.id).is_some_and(|v| {
                v.available >= window_start && v.available <= window_end
            })
        })
        .cloned()
        .collect();
    let kept_ids: std::collections::BTreeSet<usize> =
        kept_vehicles.iter().map(|va| va.id).collect();
    let kept_trucks: BTreeMap<TruckId, TruckAssignment> = truck_assignments
        .iter()
        .map(|(truck_id, assignment)| {
            let load = assignment
                .load
                .iter()
                .copied()
                .filter(|id| kept_ids.contains(id))
                .collect();
            (truck_id.clone(), TruckAssignment { load })
        })
        .collect();
    (kept_vehicles, kept_trucks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Location, LocationKind};

    fn fixture() -> (
        Vec<Vehicle>,
        Vec<VehicleAssignment>,
        BTreeMap<TruckId, Truck>,
        BTreeMap<TruckId, TruckAssignment>,
    ) {
        let plant = Location::new("GER01", LocationKind::Plant);
        let dealer = Location::new("ITA01", LocationKind::Dealer);
        let d = Day::from_ymd(2025, 1, 2).unwrap();
        let truck = Truck {
            start: plant.clone(),
            end: dealer.clone(),
            departure: d,
            arrival: d + 2,
            ordinal: 1,
            capacity: 10,
            price: 1000,
        };
        let vehicles: Vec<Vehicle> = (0..3)
            .map(|id| Vehicle {
                id,
                origin: plant.clone(),
                destination: dealer.clone(),
                available: Day::from_ymd(2025, 1, 1).unwrap() + id as i32,
                due: Day::from_ymd(2025, 1, 10).unwrap(),
            })
            .collect();
        let vehicle_assignments: Vec<VehicleAssignment> = vehicles
            .iter()
            .map(|v| {
                let mut va = VehicleAssignment::new(v.id);
                va.path.push(truck.id());
                va
            })
            .collect();
        let trucks: BTreeMap<TruckId, Truck> = [(truck.id(), truck)].into_iter().collect();
        let truck_assignments =
            crate::truck_assignments_from_vehicle_assignments(&vehicle_assignments, &trucks);
        (vehicles, vehicle_assignments, trucks, truck_assignments)
    }

    #[test]
    fn test_prorated_truck_cost() {
        // capacity 10, price 1000, 3 vehicles, no delays -> 300
        let (_, vehicle_assignments, trucks, truck_assignments) = fixture();
        let objective = objective_value(
            &vehicle_assignments,
            &truck_assignments,
            &trucks,
            &CostConfig::default(),
        );
        assert_eq!(objective, 300.0);
    }

    #[test]
    fn test_delay_costs() {
        let (_, mut vehicle_assignments, trucks, truck_assignments) = fixture();
        vehicle_assignments[0].delayed_by = 1; // unplanned: 500 + 100
        vehicle_assignments[1].planned_delayed = true;
        vehicle_assignments[1].delayed_by = 2; // planned: 200 + 100
        let objective = objective_value(
            &vehicle_assignments,
            &truck_assignments,
            &trucks,
            &CostConfig::default(),
        );
        assert_eq!(objective, 300.0 + 600.0 + 400.0);
    }

    #[test]
    fn test_zero_vehicles_zero_objective() {
        let objective = objective_value(
            &[],
            &BTreeMap::new(),
            &BTreeMap::new(),
            &CostConfig::default(),
        );
        assert_eq!(objective, 0.0);
    }

    #[test]
    fn test_remove_horizon_identity() {
        let (vehicles, vehicle_assignments, trucks, truck_assignments) = fixture();
        let (kept_vehicles, kept_trucks) = remove_horizon(
            &vehicle_assignments,
            &vehicles,
            &truck_assignments,
            &trucks,
            0,
            0,
        );
        assert_eq!(kept_vehicles, vehicle_assignments);
        assert_eq!(kept_trucks, truck_assignments);
    }

    #[test]
    fn test_remove_horizon_front() {
        let (vehicles, vehicle_assignments, trucks, truck_assignments) = fixture();
        // front = 2 keeps only the vehicle available on day 3+; the truck
        // departs on day 2 and is dropped with it.
        let (kept_vehicles, kept_trucks) = remove_horizon(
            &vehicle_assignments,
            &vehicles,
            &truck_assignments,
            &trucks,
            2,
            0,
        );
        assert_eq!(kept_vehicles.len(), 1);
        assert_eq!(kept_vehicles[0].id, 2);
        assert!(kept_trucks.is_empty());
    }

    #[test]
    fn test_remove_horizon_keep_used_trucks() {
        let (vehicles, vehicle_assignments, _, truck_assignments) = fixture();
        let (kept_vehicles, kept_trucks) = remove_horizon_keep_used_trucks(
            &vehicle_assignments,
            &vehicles,
            &truck_assignments,
            2,
            0,
        );
        assert_eq!(kept_vehicles.len(), 1);
        // Truck entry survives but only carries the kept vehicle.
        let load = &kept_trucks.values().next().unwrap().load;
        assert_eq!(load, &vec![2]);
    }

    #[test]
    fn test_metrics() {
        let (_, mut vehicle_assignments, trucks, truck_assignments) = fixture();
        vehicle_assignments[0].delayed_by = 3;
        vehicle_assignments[1].planned_delayed = true;
        let metrics =
            SolutionMetrics::compute(&vehicle_assignments, &truck_assignments, &trucks);
        assert_eq!(metrics.vehicles, 3);
        assert_eq!(metrics.delayed, 1);
        assert_eq!(metrics.planned_delayed, 1);
        assert_eq!(metrics.planned_delayed_and_late, 0);
        assert_eq!(metrics.total_delay_days, 3);
        assert_eq!(metrics.trucks_used, 1);
        assert_eq!(metrics.vehicles_on_priced_trucks, 3);
    }
}
